use crate::results::SectionData;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// Writes the four result sections as independent JSON documents so a
/// degraded section can be inspected without the others.
pub fn write_sections(dir: &Path, data: &SectionData) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    write_json(&dir.join("content.json"), &data.content)?;
    write_json(&dir.join("assets.json"), &data.assets)?;
    write_json(&dir.join("tokens.json"), &data.tokens)?;
    write_json(&dir.join("meta.json"), &data.meta)?;
    ::log::info!("Wrote section documents to {}", dir.display());
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, json)
}
