use colored::Colorize;
use scan_sign_client::signer::{PayloadDisplay, QrDisplayPayload};

/// Prints signing requests to stdout. Each frame is what a QR code of the
/// configured size would carry.
#[derive(Debug)]
pub struct TerminalDisplay;

impl PayloadDisplay for TerminalDisplay {
    fn show(&self, payload: &QrDisplayPayload) -> scan_sign_client::Result<()> {
        println!(
            "{} {} ({} frame(s), {}px)",
            "Sign with".bold(),
            payload.request.address,
            payload.frames.len(),
            payload.size
        );
        for (index, frame) in payload.frames.iter().enumerate() {
            println!("  [{index}] 0x{}", hex::encode(frame));
        }
        println!("Then enter: scan <signature hex> [id]");
        Ok(())
    }

    fn clear(&self) {
        println!("{}", "Signing request closed.".dimmed());
    }
}
