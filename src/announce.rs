use std::io::ErrorKind;
use std::process::Stdio;

use tokio::process::Command;

use crate::verdict::Announcer;

/// Speaks messages with the first available speech synthesizer.
pub struct SpeechAnnouncer {
    programs: Vec<String>,
}

impl SpeechAnnouncer {
    pub fn new(programs: Vec<String>) -> Self {
        Self { programs }
    }
}

impl Default for SpeechAnnouncer {
    fn default() -> Self {
        Self::new(vec!["say".to_string(), "espeak".to_string()])
    }
}

#[async_trait::async_trait]
impl Announcer for SpeechAnnouncer {
    async fn announce(&self, message: &str) -> anyhow::Result<()> {
        for program in &self.programs {
            let status = Command::new(program)
                .arg(message)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            match status {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => anyhow::bail!("{program} exited with {status}"),
                Err(error) if error.kind() == ErrorKind::NotFound => {
                    log::debug!("{program} is not installed");
                }
                Err(error) => return Err(anyhow::anyhow!("Cannot run {program}: {error}")),
            }
        }
        anyhow::bail!("No speech synthesizer found (tried {})", self.programs.join(", "))
    }
}
