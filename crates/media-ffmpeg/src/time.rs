use crate::error::{MediaFfmpegError, Result};

/// Rational value as reported by `ffprobe` (frame rates, time bases).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// Creates a rational with a positive denominator.
    ///
    /// # Example
    /// ```
    /// use media_ffmpeg::Rational;
    ///
    /// let rate = Rational::new(30_000, 1_001).expect("valid");
    /// assert_eq!(rate.den, 1_001);
    /// ```
    pub fn new(num: i32, den: i32) -> Result<Self> {
        if den <= 0 || num == 0 {
            return Err(MediaFfmpegError::InvalidRational { num, den });
        }

        Ok(Self { num, den })
    }

    /// Parses `num/den` text.
    ///
    /// # Example
    /// ```
    /// use media_ffmpeg::Rational;
    ///
    /// let rate = Rational::parse("25/1").expect("valid");
    /// assert_eq!(rate.as_f64(), 25.0);
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let (num, den) = input
            .split_once('/')
            .ok_or_else(|| MediaFfmpegError::Parse {
                context: "rational",
                value: input.to_string(),
            })?;
        let num = parse_i32(num, "rational num")?;
        let den = parse_i32(den, "rational den")?;
        Self::new(num, den)
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

fn parse_i32(value: &str, context: &'static str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| MediaFfmpegError::Parse {
            context,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ntsc_frame_rate() {
        let rate = Rational::parse("30000/1001").expect("valid rational");
        assert!((rate.as_f64() - 29.97).abs() < 0.01);
    }

    #[test]
    fn rejects_zero_denominator_and_garbage() {
        assert!(matches!(
            Rational::parse("30/0"),
            Err(MediaFfmpegError::InvalidRational { num: 30, den: 0 })
        ));
        assert!(matches!(
            Rational::parse("thirty"),
            Err(MediaFfmpegError::Parse { .. })
        ));
    }
}
