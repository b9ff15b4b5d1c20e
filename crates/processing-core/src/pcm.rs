//! Float to 16-bit PCM conversion.

/// Convert one float sample to signed 16-bit PCM.
///
/// Negative values scale by 32768 and non-negative values by 32767, so
/// both ends of `[-1.0, 1.0]` land exactly on the `i16` bounds. The
/// product is truncated toward zero.
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = f64::from(sample.clamp(-1.0, 1.0));
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Convert a conditioned channel into the encoder's input format.
pub fn to_fixed_point(channel: &[f32]) -> Vec<i16> {
    channel.iter().copied().map(sample_to_i16).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_bounds() {
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32768);
        assert_eq!(sample_to_i16(0.0), 0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(sample_to_i16(1.5), 32767);
        assert_eq!(sample_to_i16(-7.0), -32768);
    }

    #[test]
    fn test_truncates_toward_zero() {
        assert_eq!(sample_to_i16(0.5), 16383);
        assert_eq!(sample_to_i16(-0.5), -16384);
        // 0.95 * 32767 = 31128.65
        assert_eq!(sample_to_i16(0.95), 31128);
    }

    #[test]
    fn test_channel_conversion_preserves_order() {
        let out = to_fixed_point(&[0.0, 1.0, -1.0, 0.5]);
        assert_eq!(out, vec![0, 32767, -32768, 16383]);
    }
}
