use rust_embed::RustEmbed;

/// Data files compiled into the binary: the default audio catalog manifest
/// and the preset character lists.
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Assets;

impl Assets {
    pub fn text(name: &str) -> Option<String> {
        let file = Self::get(name)?;
        String::from_utf8(file.data.into_owned()).ok()
    }
}
