use log::{debug, info};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Adapter around the Xvfb binary providing a session's rendering surface.
#[derive(Debug, Clone)]
pub struct Xvfb {
    program: String,
    display: String,
    width: u32,
    height: u32,
    depth: u32,
}

impl Xvfb {
    pub fn new(program: &str, display: &str, width: u32, height: u32, depth: u32) -> Self {
        Self {
            program: program.to_string(),
            display: display.to_string(),
            width,
            height,
            depth,
        }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn build_args(&self) -> Vec<String> {
        vec![
            self.display.clone(),
            "-screen".into(),
            "0".into(),
            format!("{}x{}x{}", self.width, self.height, self.depth),
            "-nolisten".into(),
            "tcp".into(),
            "-nocursor".into(),
        ]
    }

    /// Spawns the display server. The caller owns the returned child.
    pub fn spawn(&self) -> Result<Child, std::io::Error> {
        info!("Starting Xvfb on {}", self.display);
        let child = Command::new(&self.program)
            .args(self.build_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!(
            "Xvfb display {} running with pid {:?}",
            self.display,
            child.id()
        );
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_encode_geometry_and_isolation() {
        let xvfb = Xvfb::new("Xvfb", ":104", 1280, 720, 24);
        let args = xvfb.build_args();

        assert_eq!(args[0], ":104");
        let screen = args.iter().position(|a| a == "-screen").unwrap();
        assert_eq!(args[screen + 1], "0");
        assert_eq!(args[screen + 2], "1280x720x24");
        let nolisten = args.iter().position(|a| a == "-nolisten").unwrap();
        assert_eq!(args[nolisten + 1], "tcp");
        assert!(args.iter().any(|a| a == "-nocursor"));
    }
}
