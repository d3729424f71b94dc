//! `fuku logs [services...]`: connects to an already-running session's
//! socket and streams its log frames to stdout.

use tokio::io::BufReader;
use tokio::net::UnixStream;

use fuku_wire::{read_frame, write_frame, LogFrame, SubscribeRequest};

use crate::exit_error::ExitError;
use crate::formatter::Formatter;
use crate::paths;

pub async fn run(services: Vec<String>, profile: Option<String>) -> Result<(), ExitError> {
    let profile = profile.unwrap_or_else(|| "default".to_string());
    let socket_path = paths::socket_path(&profile);

    let stream = UnixStream::connect(&socket_path).await.map_err(|e| {
        ExitError::startup(format!("connecting to {}: {e}", socket_path.display()))
    })?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_frame(&mut write_half, &SubscribeRequest { services })
        .await
        .map_err(|e| ExitError::startup(format!("subscribing: {e}")))?;

    let mut formatter = Formatter::new();
    loop {
        match read_frame::<_, LogFrame>(&mut reader).await {
            Ok(Some(frame)) => {
                println!("{}", formatter.format(&frame.service, &frame.message));
            }
            Ok(None) => return Ok(()),
            Err(e) => return Err(ExitError::startup(format!("reading log stream: {e}"))),
        }
    }
}
