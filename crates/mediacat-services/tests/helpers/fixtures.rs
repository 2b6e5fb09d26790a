//! Upload fixtures.

use bytes::Bytes;
use mediacat_services::CreateMediaRequest;

/// PNG signature followed by zero padding, `len` bytes in total.
pub fn png_bytes(len: usize) -> Bytes {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let mut data = vec![0u8; len];
    let head = len.min(SIGNATURE.len());
    data[..head].copy_from_slice(&SIGNATURE[..head]);
    Bytes::from(data)
}

pub fn png_upload(len: usize) -> CreateMediaRequest {
    CreateMediaRequest::new(png_bytes(len), "image/png", "cover.png")
}

pub fn mp3_upload(len: usize) -> CreateMediaRequest {
    CreateMediaRequest::new(Bytes::from(vec![0xffu8; len]), "audio/mpeg", "theme.mp3")
}

pub fn text_upload() -> CreateMediaRequest {
    CreateMediaRequest::new(Bytes::from_static(b"hello"), "text/plain", "notes.txt")
}
