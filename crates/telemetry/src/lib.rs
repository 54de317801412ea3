//! Tracing subscriber setup shared by every Bedrock binary.

use bedrock_kernel::settings::{LogFormat, TelemetrySettings};
use tracing::Subscriber;
use tracing_subscriber::{fmt::MakeWriter, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured `log_level` when present. Logs go to
/// stderr so that stdout stays reserved for command output. Calling this a
/// second time is a no-op.
pub fn init(settings: &TelemetrySettings) {
    if subscriber(settings, std::io::stderr).try_init().is_ok() {
        tracing::debug!(
            target: "bedrock-telemetry",
            level = %settings.log_level,
            format = ?settings.log_format,
            "telemetry initialized"
        );
    }
}

/// Build the fmt subscriber for `settings`, writing through `writer`.
fn subscriber<W>(settings: &TelemetrySettings, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings))
        .with_writer(writer);

    match settings.log_format {
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    }
}

fn env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured(format: LogFormat) -> String {
        let settings = TelemetrySettings {
            log_level: "info".to_string(),
            log_format: format,
        };
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = subscriber(&settings, move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "bedrock-telemetry", "captured event");
        });

        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn init_twice_is_harmless() {
        let settings = TelemetrySettings::default();
        init(&settings);
        init(&settings);
    }

    #[test]
    fn pretty_format_spans_multiple_lines() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let output = captured(LogFormat::Pretty);

        assert!(output.contains("captured event"));
        assert!(output.lines().count() > 1, "expected pretty layout: {output}");
        assert!(serde_json::from_str::<serde_json::Value>(output.trim()).is_err());
    }

    #[test]
    fn json_format_emits_one_object_per_event() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let output = captured(LogFormat::Json);

        let event: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(event["fields"]["message"], "captured event");
        assert_eq!(event["level"], "INFO");
    }

    #[test]
    fn configured_level_drives_the_filter() {
        let settings = TelemetrySettings {
            log_level: "warn".to_string(),
            log_format: LogFormat::Json,
        };
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter(&settings).to_string(), "warn");
        }
    }
}
