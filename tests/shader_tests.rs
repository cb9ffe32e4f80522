//! The bundled WGSL programs must parse and validate.

use fogfx::shader::{FOG_SHADER, TERRAIN_SHADER, WATER_SHADER};

/// Validates WGSL code using naga.
fn validate_wgsl(code: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(code).map_err(|e| format!("WGSL parse error: {:?}", e))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(module)
}

fn entry_points(module: &naga::Module) -> Vec<(&str, naga::ShaderStage)> {
    module
        .entry_points
        .iter()
        .map(|ep| (ep.name.as_str(), ep.stage))
        .collect()
}

#[test]
fn test_fog_shader_validates() {
    let module = validate_wgsl(FOG_SHADER).unwrap();
    assert_eq!(
        entry_points(&module),
        vec![("vs_main", naga::ShaderStage::Vertex), ("fs_main", naga::ShaderStage::Fragment)]
    );
}

#[test]
fn test_water_shader_validates() {
    let module = validate_wgsl(WATER_SHADER).unwrap();
    assert_eq!(entry_points(&module).len(), 2);
    assert!(WATER_SHADER.contains("texture_depth_2d"));
}

#[test]
fn test_terrain_shader_validates() {
    let module = validate_wgsl(TERRAIN_SHADER).unwrap();
    assert_eq!(entry_points(&module).len(), 2);
}

#[test]
fn test_fog_vertex_inputs_match_attribute_slots() {
    let module = validate_wgsl(FOG_SHADER).unwrap();
    let vs = module
        .entry_points
        .iter()
        .find(|ep| ep.name == "vs_main")
        .unwrap();
    let locations: Vec<u32> = vs
        .function
        .arguments
        .iter()
        .filter_map(|arg| match arg.binding {
            Some(naga::Binding::Location { location, .. }) => Some(location),
            _ => None,
        })
        .collect();
    // Four transform columns, then size, opacity and sprite offset
    assert_eq!(locations, vec![0, 1, 2, 3, 4, 5, 6]);
}
