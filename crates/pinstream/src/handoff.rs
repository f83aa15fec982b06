use std::fs;
use std::path::PathBuf;
use std::process::Command;

use console::style;
use pinstream_client::BackendClient;
use pinstream_core::{PinError, PinResult};
use pinstream_session::DownloadRequest;
use url::Url;

/// Where a constructed download address goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    Print,
    Open,
    Save(PathBuf),
}

pub async fn hand_off(
    backend: &BackendClient,
    request: &DownloadRequest,
    handoff: &Handoff,
    simple: bool,
) -> PinResult<()> {
    match handoff {
        Handoff::Print => {
            if simple {
                println!("{}", request.url);
            } else {
                println!("{} {}", style("Download:").green(), request.url);
                println!("  {} {}", style("File:").dim(), request.filename);
            }
        }
        Handoff::Open => {
            open_in_browser(&request.url)?;
            if !simple {
                println!(
                    "{} {} opened in browser",
                    style("✓").green(),
                    request.filename
                );
            }
            // The browser reports nothing back; hold the next trigger for the fixed delay.
            tokio::time::sleep(request.reenable_after).await;
        }
        Handoff::Save(dir) => {
            fs::create_dir_all(dir).map_err(|err| {
                PinError::Download(format!("failed to create {}: {err}", dir.display()))
            })?;
            let destination = dir.join(&request.filename);
            let written = backend.save_download(&request.url, &destination).await?;
            if simple {
                println!("{}", destination.display());
            } else {
                println!(
                    "{} Saved {} ({} bytes)",
                    style("✓").green(),
                    destination.display(),
                    written
                );
            }
        }
    }
    Ok(())
}

fn open_in_browser(url: &Url) -> PinResult<()> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };

    let status = command
        .arg(url.as_str())
        .status()
        .map_err(|err| PinError::Download(format!("failed to launch browser: {err}")))?;

    if !status.success() {
        return Err(PinError::Download(format!(
            "browser opener exited with status: {}",
            status
        )));
    }

    Ok(())
}
