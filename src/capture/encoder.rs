use log::{debug, info};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

/// A bitrate in ffmpeg notation, e.g. `3500k` or `4M`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitrate {
    value: u64,
    unit: String,
}

fn bitrate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([0-9]+)\s*([kKmM]?)$").unwrap())
}

impl FromStr for Bitrate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = bitrate_pattern()
            .captures(s.trim())
            .ok_or_else(|| format!("invalid bitrate '{}'", s))?;
        let value: u64 = captures[1]
            .parse()
            .map_err(|_| format!("invalid bitrate '{}'", s))?;
        let unit = match &captures[2] {
            "" => String::from("k"),
            suffix => suffix.to_string(),
        };
        Ok(Bitrate { value, unit })
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

impl Bitrate {
    /// Twice the bitrate, used as the encoder buffer size.
    pub fn doubled(&self) -> String {
        format!("{}{}", self.value * 2, self.unit)
    }
}

/// Encoding parameters for one session's HLS output.
#[derive(Debug, Clone, PartialEq)]
pub struct HlsProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate: Bitrate,
    pub audio: bool,
    pub audio_device: String,
    pub audio_bitrate: Bitrate,
    pub segment_seconds: u32,
    pub list_size: u32,
}

impl Default for HlsProfile {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 15,
            video_bitrate: "3500k".parse().unwrap(),
            audio: false,
            audio_device: String::from("default"),
            audio_bitrate: "128k".parse().unwrap(),
            segment_seconds: 2,
            list_size: 6,
        }
    }
}

impl HlsProfile {
    pub fn variant_name(&self) -> String {
        format!("variant_{}p.m3u8", self.height)
    }

    /// GOP length; two seconds of frames keeps segment boundaries on
    /// keyframes for 2s segments.
    pub fn gop(&self) -> u32 {
        self.fps * 2
    }
}

/// Builds and spawns the ffmpeg process capturing an X display into a rolling
/// HLS playlist inside the session working directory. ffmpeg itself prunes
/// segments that fall out of the window (`delete_segments`).
#[derive(Debug, Clone)]
pub struct HlsEncoder {
    program: String,
    display: String,
    out_dir: PathBuf,
    profile: HlsProfile,
}

pub const MASTER_PLAYLIST: &str = "index.m3u8";

impl HlsEncoder {
    pub fn new(program: &str, display: &str, out_dir: &Path, profile: HlsProfile) -> Self {
        Self {
            program: program.to_string(),
            display: display.to_string(),
            out_dir: out_dir.to_path_buf(),
            profile,
        }
    }

    pub fn master_playlist(&self) -> PathBuf {
        self.out_dir.join(MASTER_PLAYLIST)
    }

    pub fn variant_playlist(&self) -> PathBuf {
        self.out_dir.join(self.profile.variant_name())
    }

    /// Full ffmpeg argument list (everything after the program name).
    pub fn build_args(&self) -> Vec<String> {
        let profile = &self.profile;
        let mut args: Vec<String> = vec![
            "-loglevel".into(),
            "warning".into(),
            "-nostdin".into(),
            "-y".into(),
            "-f".into(),
            "x11grab".into(),
            "-framerate".into(),
            profile.fps.to_string(),
            "-video_size".into(),
            format!("{}x{}", profile.width, profile.height),
            "-i".into(),
            self.display.clone(),
        ];

        if profile.audio {
            args.extend(["-f".into(), "pulse".into(), "-i".into(), profile.audio_device.clone()]);
        }

        args.extend([
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "veryfast".into(),
            "-tune".into(),
            "zerolatency".into(),
            "-b:v".into(),
            profile.video_bitrate.to_string(),
            "-maxrate".into(),
            profile.video_bitrate.to_string(),
            "-bufsize".into(),
            profile.video_bitrate.doubled(),
            "-g".into(),
            profile.gop().to_string(),
            "-keyint_min".into(),
            profile.gop().to_string(),
            "-sc_threshold".into(),
            "0".into(),
        ]);

        if profile.audio {
            args.extend([
                "-c:a".into(),
                "aac".into(),
                "-b:a".into(),
                profile.audio_bitrate.to_string(),
                "-ac".into(),
                "2".into(),
            ]);
        }

        args.extend([
            "-hls_time".into(),
            profile.segment_seconds.to_string(),
            "-hls_list_size".into(),
            profile.list_size.to_string(),
            "-hls_flags".into(),
            "delete_segments+independent_segments".into(),
            "-master_pl_name".into(),
            MASTER_PLAYLIST.into(),
            "-f".into(),
            "hls".into(),
            self.variant_playlist().to_string_lossy().into_owned(),
        ]);

        args
    }

    /// Spawns the encoder. The caller owns the returned child process.
    pub fn spawn(&self) -> Result<Child, std::io::Error> {
        info!(
            "Starting encoder for display {} -> {}",
            self.display,
            self.variant_playlist().display()
        );

        let mut child = Command::new(&self.program)
            .args(self.build_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stderr) = child.stderr.take() {
            let display = self.display.clone();
            let mut reader = BufReader::new(stderr).lines();
            tokio::spawn(async move {
                while let Ok(Some(line)) = reader.next_line().await {
                    debug!("[encoder:{}] {}", display, line);
                }
                debug!("stderr monitoring ended for encoder on {}", display);
            });
        }

        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder(profile: HlsProfile) -> HlsEncoder {
        HlsEncoder::new("ffmpeg", ":99", Path::new("/tmp/out"), profile)
    }

    #[test]
    fn bitrate_parsing() {
        let bitrate: Bitrate = "3500k".parse().unwrap();
        assert_eq!(bitrate.to_string(), "3500k");
        assert_eq!(bitrate.doubled(), "7000k");

        let bare: Bitrate = "4500".parse().unwrap();
        assert_eq!(bare.to_string(), "4500k");

        let mega: Bitrate = "4M".parse().unwrap();
        assert_eq!(mega.doubled(), "8M");

        assert!("".parse::<Bitrate>().is_err());
        assert!("fast".parse::<Bitrate>().is_err());
        assert!("3.5m".parse::<Bitrate>().is_err());
    }

    #[test]
    fn video_only_command() {
        let args = encoder(HlsProfile::default()).build_args();

        let expect_pair = |flag: &str, value: &str| {
            let idx = args
                .iter()
                .position(|a| a == flag)
                .unwrap_or_else(|| panic!("missing {}", flag));
            assert_eq!(args[idx + 1], value, "value for {}", flag);
        };

        expect_pair("-f", "x11grab");
        expect_pair("-framerate", "15");
        expect_pair("-video_size", "1920x1080");
        expect_pair("-i", ":99");
        expect_pair("-b:v", "3500k");
        expect_pair("-maxrate", "3500k");
        expect_pair("-bufsize", "7000k");
        expect_pair("-g", "30");
        expect_pair("-keyint_min", "30");
        expect_pair("-hls_time", "2");
        expect_pair("-hls_list_size", "6");
        expect_pair("-hls_flags", "delete_segments+independent_segments");
        expect_pair("-master_pl_name", "index.m3u8");

        assert!(!args.iter().any(|a| a == "pulse"));
        assert!(!args.iter().any(|a| a == "-c:a"));
        assert_eq!(args.last().unwrap(), "/tmp/out/variant_1080p.m3u8");
    }

    #[test]
    fn audio_command_includes_pulse_input_and_aac() {
        let mut profile = HlsProfile::default();
        profile.audio = true;
        profile.audio_device = String::from("capture.monitor");
        let args = encoder(profile).build_args();

        let pulse = args.iter().position(|a| a == "pulse").unwrap();
        assert_eq!(args[pulse + 1], "-i");
        assert_eq!(args[pulse + 2], "capture.monitor");

        let aac = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[aac + 1], "aac");
        let channels = args.iter().position(|a| a == "-ac").unwrap();
        assert_eq!(args[channels + 1], "2");
    }

    #[test]
    fn variant_name_tracks_height() {
        let mut profile = HlsProfile::default();
        profile.height = 720;
        assert_eq!(profile.variant_name(), "variant_720p.m3u8");
    }
}
