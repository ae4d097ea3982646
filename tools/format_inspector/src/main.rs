use std::env;
use std::path::Path;

use quarry_client::renderer::format::{
    AttributeBinder, AttributePointer, ProgramHandle, VertexFormat, ENTITY_FORMAT, TERRAIN_FORMAT,
};
use quarry_client::settings::RenderSettings;
use tracing::info;

/// Prints each binding call instead of issuing it.
struct PrintBinder;

impl AttributeBinder for PrintBinder {
    fn enable_attributes(&mut self, count: u32) {
        println!("    enable attributes 0..{count}");
    }

    fn attribute_pointer(&mut self, pointer: AttributePointer) {
        println!(
            "    pointer #{} size={} type=0x{:04X} normalized={} stride={} source={:?}",
            pointer.index,
            pointer.component_count,
            pointer.gl_type,
            pointer.normalized,
            pointer.stride,
            pointer.source
        );
    }

    fn bind_attribute_location(&mut self, program: ProgramHandle, index: u32, name: &str) {
        println!("    program {} location {index} = {name}", program.0);
    }
}

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut show_bindings = false;
    let mut settings_path = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--bindings" => show_bindings = true,
            "-h" | "--help" => {
                eprintln!("Usage: format_inspector [--bindings] [path/to/render.toml]");
                std::process::exit(2);
            }
            _ => settings_path = Some(arg),
        }
    }

    if let Some(path) = settings_path {
        let settings = RenderSettings::load_or_create(Path::new(&path));
        info!("Loaded render settings from {path}: {settings:?}");
        settings.apply();
    }

    if let Err(err) = run(show_bindings) {
        eprintln!("format_inspector error: {err}");
        std::process::exit(1);
    }
}

fn run(show_bindings: bool) -> Result<(), String> {
    for (name, format) in [("terrain", &*TERRAIN_FORMAT), ("entity", &*ENTITY_FORMAT)] {
        describe(name, format)?;
        if show_bindings {
            println!("  buffer binding:");
            format.enable_and_bind_attributes(&mut PrintBinder, 0);
            println!("  program attributes:");
            format.bind_program_attributes(&mut PrintBinder, ProgramHandle(1));
        }
    }
    Ok(())
}

fn describe(name: &str, format: &VertexFormat) -> Result<(), String> {
    let attributes = format
        .wgpu_attributes()
        .map_err(|err| format!("{name} format has no wgpu layout: {err}"))?;

    println!("Format: {name}");
    println!(
        "  stride: {} bytes ({} words), {} attributes",
        format.vertex_stride_bytes(),
        format.vertex_stride_ints(),
        format.attribute_count()
    );
    for (index, (element, attribute)) in format.elements().iter().zip(&attributes).enumerate() {
        println!(
            "  [{index}] {:<10} {} x {:?} @ {} -> {:?} ({})",
            format!("{:?}", element.usage),
            element.component_count,
            element.element_type,
            attribute.offset,
            attribute.format,
            element.attribute_name.unwrap_or("<unnamed>")
        );
    }
    Ok(())
}
