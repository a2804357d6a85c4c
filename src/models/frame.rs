use base64::{ engine::general_purpose::STANDARD, Engine as _ };
use chrono::{ DateTime, Utc };

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// An encoded still taken from the display stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedFrame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    pub fn mime_type(&self) -> &'static str {
        JPEG_MIME_TYPE
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.jpeg)
    }

    /// `data:` URL form, directly embeddable by a web front-end.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", JPEG_MIME_TYPE, self.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_carries_jpeg_prefix_and_payload() {
        let frame = CapturedFrame {
            jpeg: vec![0xff, 0xd8, 0xff],
            width: 2,
            height: 2,
            captured_at: Utc::now(),
        };

        assert_eq!(frame.to_base64(), "/9j/");
        assert_eq!(frame.to_data_url(), "data:image/jpeg;base64,/9j/");
    }
}
