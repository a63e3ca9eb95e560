use std::ffi::OsStr;

use mime::Mime;

/// Content type by file extension. The namespace serves arbitrary files,
/// so this only names the types the gateway itself produces or that
/// browsers refuse to sniff (thumbnails, directory index pages, the json
/// index documents) plus a few common media types; everything else is an
/// octet stream.
pub fn mime_from_ext(ext: Option<&OsStr>) -> Mime {
    let Some(ext) = ext.and_then(|ext| ext.to_str()) else {
        return mime::APPLICATION_OCTET_STREAM;
    };

    let name = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "html" => "text/html",
        "css" => "text/css",
        "txt" => "text/plain",
        "js" => "application/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => return mime::APPLICATION_OCTET_STREAM
    };

    name.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_and_unknown_extensions() {
        assert_eq!(
            mime_from_ext(Some(OsStr::new("png"))).to_string(),
            "image/png"
        );
        assert_eq!(
            mime_from_ext(Some(OsStr::new("JPG"))).to_string(),
            "image/jpeg"
        );
        assert_eq!(
            mime_from_ext(Some(OsStr::new("bin"))),
            mime::APPLICATION_OCTET_STREAM
        );
        assert_eq!(mime_from_ext(None), mime::APPLICATION_OCTET_STREAM);
    }
}
