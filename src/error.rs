use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PocketboyError {
    #[snafu(display("Cartridge image is {} bytes, the header alone needs 0x150", size))]
    CartridgeTooSmall { size: usize },
    #[snafu(display("Failed to read ROM file {}: {}", path, source))]
    RomFileUnreadable { path: String, source: std::io::Error },
    #[snafu(display("Unknown console model: {}", name))]
    UnknownModel { name: String },
}
