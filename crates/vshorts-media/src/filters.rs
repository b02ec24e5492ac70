//! FFmpeg filter graph builders.

/// Width of vertical short output.
pub const SHORT_WIDTH: u32 = 1080;
/// Height of vertical short output.
pub const SHORT_HEIGHT: u32 = 1920;

/// Scale to the short width and letterbox onto a black vertical canvas.
pub fn vertical_pad_filter(width: u32, height: u32) -> String {
    format!(
        "scale={w}:-2,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black",
        w = width,
        h = height
    )
}

/// Filter for the default 1080x1920 short canvas.
pub fn short_filter() -> String {
    vertical_pad_filter(SHORT_WIDTH, SHORT_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_filter() {
        assert_eq!(
            short_filter(),
            "scale=1080:-2,pad=1080:1920:(ow-iw)/2:(oh-ih)/2:black"
        );
    }
}
