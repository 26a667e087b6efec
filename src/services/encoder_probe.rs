use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Name of the external encoder binary.
#[cfg(target_os = "windows")]
pub const ENCODER_PROGRAM: &str = "ffmpeg.exe";
#[cfg(not(target_os = "windows"))]
pub const ENCODER_PROGRAM: &str = "ffmpeg";

/// Bound on the startup `-version` probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether the encoder could be run at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderProbe {
    /// First line of the `-version` output
    Available(String),
    Missing(String),
}

impl EncoderProbe {
    pub fn is_available(&self) -> bool {
        matches!(self, EncoderProbe::Available(_))
    }
}

/// Platform-specific advice for installing the encoder.
pub fn install_hint() -> &'static str {
    if cfg!(target_os = "windows") {
        "Windows: Download from https://ffmpeg.org/download.html"
    } else if cfg!(target_os = "macos") {
        "macOS: brew install ffmpeg"
    } else {
        "Linux: sudo apt install ffmpeg (Debian/Ubuntu)"
    }
}

/// Run `<program> -version` with a timeout.
///
/// Absence is never an error: it is reported as [`EncoderProbe::Missing`]
/// and logged as a warning with an install hint.
pub async fn probe_encoder(program: &str, limit: Duration) -> EncoderProbe {
    let mut command = Command::new(program);
    command
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let outcome = match timeout(limit, command.output()).await {
        Err(_) => EncoderProbe::Missing(format!("{} did not answer within {:?}", program, limit)),
        Ok(Err(e)) => EncoderProbe::Missing(format!("{} could not be run: {}", program, e)),
        Ok(Ok(output)) if !output.status.success() => {
            EncoderProbe::Missing(format!("{} -version exited with {}", program, output.status))
        }
        Ok(Ok(output)) => {
            let banner = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or(program)
                .to_string();
            EncoderProbe::Available(banner)
        }
    };

    match &outcome {
        EncoderProbe::Available(banner) => tracing::info!("Encoder found: {}", banner),
        EncoderProbe::Missing(reason) => tracing::warn!(
            "Encoder not found, timelapse creation will not work ({}). {}",
            reason,
            install_hint()
        ),
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_not_an_error() {
        let probe = probe_encoder("daily-portrait-no-such-encoder", PROBE_TIMEOUT).await;
        assert!(matches!(probe, EncoderProbe::Missing(_)));
        assert!(!probe.is_available());
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_program_falls_back_to_name() {
        // `true` accepts any argument and prints nothing
        let probe = tokio_test::block_on(probe_encoder("true", PROBE_TIMEOUT));
        assert_eq!(probe, EncoderProbe::Available("true".to_string()));
    }

    #[test]
    fn test_install_hint_is_platform_specific() {
        assert!(install_hint().contains("ffmpeg"));
    }
}
