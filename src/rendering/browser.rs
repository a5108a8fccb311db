use log::{debug, info};
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Everything needed to point a browser at a page on a session display.
#[derive(Debug, Clone)]
pub struct BrowserLaunch {
    pub url: String,
    pub display: String,
    pub width: u32,
    pub height: u32,
    pub hide_ui: bool,
    pub cookies_path: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
}

/// Scratch state materialized in the session working directory before the
/// browser starts: a profile directory and the generated helper extension.
#[derive(Debug, Clone)]
pub struct PreparedBrowser {
    profile_dir: PathBuf,
    extension_dir: PathBuf,
}

/// Keeps the captured page from throttling itself while it renders
/// off-screen. Injected into every page at document start.
const ANTI_IDLE_SCRIPT: &str = r#"(() => {
  const keepAwake = () => {
    if (document.hidden) {
      Object.defineProperty(document, "hidden", { value: false, configurable: true });
    }
    window.requestAnimationFrame(() => {});
  };
  keepAwake();
  document.addEventListener("visibilitychange", keepAwake, true);
  window.addEventListener("pagehide", keepAwake, true);
})();
"#;

const DEFAULT_BROWSER_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-renderer-backgrounding",
    "--disable-backgrounding-occluded-windows",
    "--autoplay-policy=no-user-gesture-required",
];

/// Adapter spawning a Chromium instance on a session display.
///
/// Script and cookie injection go through a small unpacked extension written
/// into the session working directory; a spawned browser offers no other
/// injection channel that survives navigation.
#[derive(Debug, Clone)]
pub struct ChromiumDriver {
    program: String,
}

impl ChromiumDriver {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// Validates a cookies file: a JSON array of cookie objects, each with at
    /// least a string `name` and `value`.
    pub fn load_cookies(path: &Path) -> Result<Vec<serde_json::Value>, Error> {
        let raw = std::fs::read_to_string(path)?;
        let parsed: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| Error::new(ErrorKind::InvalidData, format!("cookies file: {}", e)))?;
        let entries = parsed
            .as_array()
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "cookies JSON must be a list"))?;
        for entry in entries {
            let object = entry
                .as_object()
                .ok_or_else(|| Error::new(ErrorKind::InvalidData, "invalid cookie entry"))?;
            if !object.get("name").map(|v| v.is_string()).unwrap_or(false)
                || !object.get("value").map(|v| v.is_string()).unwrap_or(false)
            {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    "cookie entry missing string name/value",
                ));
            }
        }
        Ok(entries.clone())
    }

    /// Writes the profile and helper extension under `workdir` and returns
    /// the prepared scratch layout. Nothing under these directories is ever
    /// served by the artifact routes.
    pub fn prepare(&self, workdir: &Path, launch: &BrowserLaunch) -> Result<PreparedBrowser, Error> {
        let profile_dir = match &launch.user_data_dir {
            Some(dir) => dir.clone(),
            None => workdir.join("profile"),
        };
        std::fs::create_dir_all(&profile_dir)?;

        let extension_dir = workdir.join("ext");
        std::fs::create_dir_all(&extension_dir)?;
        std::fs::write(extension_dir.join("content.js"), ANTI_IDLE_SCRIPT)?;

        let cookies = match &launch.cookies_path {
            Some(path) => Self::load_cookies(path)?,
            None => Vec::new(),
        };
        let with_cookies = !cookies.is_empty();
        if with_cookies {
            debug!("Injecting {} cookies via helper extension", cookies.len());
            std::fs::write(
                extension_dir.join("background.js"),
                Self::background_script(&cookies),
            )?;
        }
        std::fs::write(
            extension_dir.join("manifest.json"),
            Self::manifest(with_cookies),
        )?;

        Ok(PreparedBrowser {
            profile_dir,
            extension_dir,
        })
    }

    fn manifest(with_cookies: bool) -> String {
        let mut manifest = serde_json::json!({
            "manifest_version": 3,
            "name": "webcast agent",
            "version": "1.0",
            "content_scripts": [{
                "matches": ["<all_urls>"],
                "js": ["content.js"],
                "run_at": "document_start"
            }]
        });
        if with_cookies {
            manifest["permissions"] = serde_json::json!(["cookies"]);
            manifest["host_permissions"] = serde_json::json!(["<all_urls>"]);
            manifest["background"] = serde_json::json!({ "service_worker": "background.js" });
        }
        serde_json::to_string_pretty(&manifest).unwrap_or_default()
    }

    fn background_script(cookies: &[serde_json::Value]) -> String {
        let payload = serde_json::to_string(cookies).unwrap_or_else(|_| String::from("[]"));
        format!(
            r#"const COOKIES = {payload};
for (const c of COOKIES) {{
  const scheme = c.secure ? "https" : "http";
  const host = (c.domain || "").replace(/^\./, "");
  chrome.cookies.set({{
    url: `${{scheme}}://${{host}}${{c.path || "/"}}`,
    name: c.name,
    value: c.value,
    domain: c.domain,
    path: c.path || "/",
    secure: !!c.secure,
    httpOnly: !!c.httpOnly,
  }});
}}
"#
        )
    }

    pub fn build_args(&self, prepared: &PreparedBrowser, launch: &BrowserLaunch) -> Vec<String> {
        let mut args: Vec<String> = DEFAULT_BROWSER_ARGS.iter().map(|a| a.to_string()).collect();
        args.push(format!("--user-data-dir={}", prepared.profile_dir.display()));
        args.push(format!(
            "--load-extension={}",
            prepared.extension_dir.display()
        ));
        args.push("--window-position=0,0".into());
        args.push(format!("--window-size={},{}", launch.width, launch.height));
        if launch.hide_ui {
            args.push("--kiosk".into());
        }
        args.push(launch.url.clone());
        args
    }

    /// Spawns the browser on the session display. The caller owns the child.
    pub fn spawn(&self, prepared: &PreparedBrowser, launch: &BrowserLaunch) -> Result<Child, Error> {
        info!(
            "Starting browser on {} for {}",
            launch.display, launch.url
        );
        let child = Command::new(&self.program)
            .args(self.build_args(prepared, launch))
            .env("DISPLAY", &launch.display)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!(
            "Browser on {} running with pid {:?}",
            launch.display,
            child.id()
        );
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch() -> BrowserLaunch {
        BrowserLaunch {
            url: String::from("https://example.com/board"),
            display: String::from(":99"),
            width: 1280,
            height: 720,
            hide_ui: true,
            cookies_path: None,
            user_data_dir: None,
        }
    }

    #[test]
    fn cookie_file_must_be_a_list_of_objects() {
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("cookies.json");
        std::fs::write(
            &good,
            r#"[{"name": "sid", "value": "abc", "domain": ".example.com"}]"#,
        )
        .unwrap();
        let cookies = ChromiumDriver::load_cookies(&good).unwrap();
        assert_eq!(cookies.len(), 1);

        let not_a_list = dir.path().join("map.json");
        std::fs::write(&not_a_list, r#"{"name": "sid"}"#).unwrap();
        assert!(ChromiumDriver::load_cookies(&not_a_list).is_err());

        let bad_entry = dir.path().join("bad.json");
        std::fs::write(&bad_entry, r#"[42]"#).unwrap();
        assert!(ChromiumDriver::load_cookies(&bad_entry).is_err());

        let missing_value = dir.path().join("missing.json");
        std::fs::write(&missing_value, r#"[{"name": "sid"}]"#).unwrap();
        assert!(ChromiumDriver::load_cookies(&missing_value).is_err());
    }

    #[test]
    fn prepare_writes_extension_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let driver = ChromiumDriver::new("chromium");
        let prepared = driver.prepare(dir.path(), &launch()).unwrap();

        assert!(dir.path().join("profile").is_dir());
        assert!(dir.path().join("ext/manifest.json").is_file());
        let content = std::fs::read_to_string(dir.path().join("ext/content.js")).unwrap();
        assert!(content.contains("visibilitychange"));
        // No cookies: no background worker, no cookie permission.
        assert!(!dir.path().join("ext/background.js").exists());
        let manifest = std::fs::read_to_string(dir.path().join("ext/manifest.json")).unwrap();
        assert!(!manifest.contains("cookies"));

        let args = driver.build_args(&prepared, &launch());
        assert!(args.iter().any(|a| a == "--kiosk"));
        assert!(args.iter().any(|a| a == "--window-size=1280,720"));
        assert!(args
            .iter()
            .any(|a| a.starts_with("--load-extension=") && a.ends_with("/ext")));
        assert_eq!(args.last().unwrap(), "https://example.com/board");
    }

    #[test]
    fn prepare_embeds_cookies_in_background_worker() {
        let dir = tempfile::tempdir().unwrap();
        let cookies_path = dir.path().join("cookies.json");
        std::fs::write(
            &cookies_path,
            r#"[{"name": "sid", "value": "s3cret", "domain": ".example.com", "secure": true}]"#,
        )
        .unwrap();

        let mut launch_cfg = launch();
        launch_cfg.cookies_path = Some(cookies_path);
        let driver = ChromiumDriver::new("chromium");
        driver.prepare(dir.path(), &launch_cfg).unwrap();

        let background = std::fs::read_to_string(dir.path().join("ext/background.js")).unwrap();
        assert!(background.contains("s3cret"));
        let manifest = std::fs::read_to_string(dir.path().join("ext/manifest.json")).unwrap();
        assert!(manifest.contains("\"cookies\""));
        assert!(manifest.contains("background.js"));
    }

    #[test]
    fn windowed_mode_drops_kiosk_and_honors_profile_override() {
        let dir = tempfile::tempdir().unwrap();
        let profile_override = dir.path().join("my-profile");
        let mut launch_cfg = launch();
        launch_cfg.hide_ui = false;
        launch_cfg.user_data_dir = Some(profile_override.clone());

        let driver = ChromiumDriver::new("chromium");
        let prepared = driver.prepare(dir.path(), &launch_cfg).unwrap();
        let args = driver.build_args(&prepared, &launch_cfg);

        assert!(!args.iter().any(|a| a == "--kiosk"));
        assert!(args
            .iter()
            .any(|a| *a == format!("--user-data-dir={}", profile_override.display())));
    }
}
