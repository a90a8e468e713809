//! Output decoding for subprocess output.
//!
//! Console output is UTF-8 everywhere except Windows, where it follows the
//! active console code page. The code page is probed once with `chcp` at
//! start-up; anything that goes wrong falls back to the ANSI code page and
//! finally to GBK. Resolution never fails.

use encoding_rs::Encoding;
use renew_shared::PlatformKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Decoder used for captured process output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDecoder {
    encoding: &'static Encoding,
}

impl OutputDecoder {
    pub fn utf8() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
        }
    }

    /// Last resort when neither the console nor the system report anything usable
    pub fn legacy_fallback() -> Self {
        Self {
            encoding: encoding_rs::GBK,
        }
    }

    /// Console code pages recognized from `chcp`
    pub fn for_console_code_page(code_page: u32) -> Option<Self> {
        let encoding = match code_page {
            936 => encoding_rs::GBK,
            65001 => encoding_rs::UTF_8,
            950 => encoding_rs::BIG5,
            _ => return None,
        };
        Some(Self { encoding })
    }

    /// Windows ANSI code pages used as the system default
    pub fn for_ansi_code_page(code_page: u32) -> Option<Self> {
        if let Some(decoder) = Self::for_console_code_page(code_page) {
            return Some(decoder);
        }
        let encoding = match code_page {
            874 => encoding_rs::WINDOWS_874,
            932 => encoding_rs::SHIFT_JIS,
            949 => encoding_rs::EUC_KR,
            1250 => encoding_rs::WINDOWS_1250,
            1251 => encoding_rs::WINDOWS_1251,
            1252 => encoding_rs::WINDOWS_1252,
            1253 => encoding_rs::WINDOWS_1253,
            1254 => encoding_rs::WINDOWS_1254,
            1255 => encoding_rs::WINDOWS_1255,
            1256 => encoding_rs::WINDOWS_1256,
            1257 => encoding_rs::WINDOWS_1257,
            1258 => encoding_rs::WINDOWS_1258,
            _ => return None,
        };
        Some(Self { encoding })
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode bytes, replacing malformed sequences
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(bytes);
        if had_errors {
            debug!("Malformed {} sequences in command output", self.name());
        }
        text.into_owned()
    }
}

impl Default for OutputDecoder {
    fn default() -> Self {
        Self::utf8()
    }
}

/// First run of ASCII digits in `chcp` output ("Active code page: 936")
pub fn parse_code_page(output: &str) -> Option<u32> {
    let start = output.find(|c: char| c.is_ascii_digit())?;
    let digits: String = output[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Pick a decoder from the probe output and the system default.
///
/// Order: recognized console code page, then system default, then GBK.
pub fn choose_decoder(
    platform: PlatformKind,
    chcp_output: Option<&str>,
    system_default: Option<OutputDecoder>,
) -> OutputDecoder {
    if platform != PlatformKind::Windows {
        return OutputDecoder::utf8();
    }

    if let Some(decoder) = chcp_output
        .and_then(parse_code_page)
        .and_then(OutputDecoder::for_console_code_page)
    {
        return decoder;
    }

    system_default.unwrap_or_else(OutputDecoder::legacy_fallback)
}

/// Resolve the decoder for the running host
pub async fn resolve(platform: PlatformKind, probe_timeout: Duration) -> OutputDecoder {
    if platform != PlatformKind::Windows {
        return OutputDecoder::utf8();
    }

    let chcp_output = probe_console_code_page(probe_timeout).await;
    let decoder = choose_decoder(platform, chcp_output.as_deref(), system_default_decoder());
    info!("Console output decoder: {}", decoder.name());
    decoder
}

async fn probe_console_code_page(probe_timeout: Duration) -> Option<String> {
    let child = Command::new("cmd")
        .args(["/C", "chcp"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(c) => c,
        Err(e) => {
            warn!("Code page probe failed to start: {}", e);
            return None;
        }
    };

    match tokio::time::timeout(probe_timeout, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => {
            // Digits are ASCII in every console code page
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(Ok(output)) => {
            warn!("Code page probe exited with {}", output.status);
            None
        }
        Ok(Err(e)) => {
            warn!("Code page probe failed: {}", e);
            None
        }
        Err(_) => {
            warn!("Code page probe timed out after {:?}", probe_timeout);
            None
        }
    }
}

#[cfg(windows)]
fn system_default_decoder() -> Option<OutputDecoder> {
    // SAFETY: GetACP takes no arguments and only reads process state
    let code_page = unsafe { windows_sys::Win32::Globalization::GetACP() };
    OutputDecoder::for_ansi_code_page(code_page)
}

#[cfg(not(windows))]
fn system_default_decoder() -> Option<OutputDecoder> {
    None
}
