use percent_encoding::percent_decode_str;

// Protocol headers used across the handler family.
pub const HEADER_OVERRIDE: &str = "X-WOPI-Override";
pub const HEADER_LOCK: &str = "X-WOPI-Lock";
pub const HEADER_ITEM_VERSION: &str = "X-WOPI-ItemVersion";
pub const HEADER_MACHINE_NAME: &str = "X-WOPI-MachineName";

/// File ids map 1:1 onto store keys, so anything that could walk the
/// filesystem is rejected outright.
pub fn is_valid_file_id(file_id: &str) -> bool {
    !file_id.is_empty()
        && file_id != "."
        && file_id != ".."
        && !file_id.contains(['/', '\\'])
        && !file_id.contains('\0')
}

/// Detects a double-encoded WOPISrc. The value arrives here already decoded
/// once by query parsing, so a well-formed WOPISrc is a plain URL; if it
/// still decodes to something different, a proxy encoded it twice and the
/// editor will fail in confusing ways. Reject it up front with a 400.
pub fn is_malformed_wopi_src(wopi_src: &str) -> bool {
    let Ok(once) = percent_decode_str(wopi_src).decode_utf8() else {
        return true;
    };
    if once == wopi_src {
        return false;
    }
    match percent_decode_str(&once).decode_utf8() {
        Ok(twice) => twice == once,
        Err(_) => true,
    }
}

/// Content type by file extension. Office formats get their exact OOXML
/// types; anything unknown is served as an opaque byte stream.
pub fn content_type_for(file_id: &str) -> &'static str {
    let ext = file_id.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "doc" => "application/msword",
        "xls" => "application/vnd.ms-excel",
        "ppt" => "application/vnd.ms-powerpoint",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => mime::APPLICATION_OCTET_STREAM.as_ref(),
    }
}
