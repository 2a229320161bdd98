//! Interactive Ledger connection helper.
//!
//! Prints the connection instructions for the configured transport, keeps
//! them current as the device is detected and verified, and lets the user
//! activate the offered links by number.

use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use ledger_connect::{
    config::Config,
    field::{FieldOptions, FieldServices, LedgerInstructionField, MountedField},
    hid::{self, HidBackend},
    i18n::{MessageCatalog, Translate},
    platform::{CommandPlatform, PlatformCommand},
    render::Instructions,
    state::AppState,
    tracing::{self, prelude::*},
    transport,
    types::{EnvironmentType, PlatformKind, TransportType},
};

#[derive(Parser, Debug)]
#[command(
    name = "ledger-connect",
    about = "Guide a Ledger hardware wallet connection"
)]
struct Args {
    /// Configuration file
    #[arg(long, env = "LEDGER_CONNECT_CONFIG")]
    config: Option<PathBuf>,

    /// Transport: ledgerLive, webhid or u2f
    #[arg(long)]
    transport: Option<TransportType>,

    /// Environment: popup, notification, fullscreen or background
    #[arg(long)]
    environment: Option<EnvironmentType>,

    /// Browser platform: chrome, firefox, brave, edge or opera
    #[arg(long)]
    platform: Option<PlatformKind>,

    /// Show the contract data / blind signing step
    #[arg(long)]
    show_data_instruction: bool,

    /// messages.json to use instead of the built-in English text
    #[arg(long)]
    messages: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(transport) = self.transport {
            config.ledger.transport = transport;
        }
        if let Some(environment) = self.environment {
            config.environment.kind = environment;
        }
        if let Some(platform) = self.platform {
            config.environment.platform = platform;
        }
        if self.show_data_instruction {
            config.ledger.show_data_instruction = true;
        }
        if let Some(messages) = &self.messages {
            config.i18n.messages = Some(messages.clone());
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Link(usize),
    Reload,
    Quit,
    Invalid,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "q" | "quit" => Input::Quit,
        "r" | "reload" => Input::Reload,
        other => match other.parse::<usize>() {
            Ok(n) if n > 0 => Input::Link(n),
            _ => Input::Invalid,
        },
    }
}

fn show(instructions: &Instructions) {
    println!();
    print!("{}", instructions);
    if instructions.links().next().is_some() {
        println!("(enter a link number, r to reload, q to quit)");
    }
}

async fn remount(mounted: MountedField, environment: Option<EnvironmentType>) -> MountedField {
    let field = mounted.unmount().await;
    let field = match environment {
        Some(environment) => field.with_options(FieldOptions {
            environment,
            ..field.options()
        }),
        None => field,
    };
    debug!(environment = %field.options().environment, "Remounting");
    field.mount()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing::init_journald_or_stdout();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    args.apply(&mut config);
    debug!(config = ?config, "Effective configuration");

    let messages: Arc<dyn Translate> = match &config.i18n.messages {
        Some(path) => Arc::new(
            MessageCatalog::load(path)
                .with_context(|| format!("loading messages from {}", path.display()))?,
        ),
        None => Arc::new(MessageCatalog::english()),
    };

    let hid: Arc<dyn HidBackend> = Arc::from(hid::default_backend());
    let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
    let services = FieldServices {
        transport: transport::default_factory(hid.clone()),
        hid,
        platform: Arc::new(CommandPlatform::new(cmd_tx)),
        messages,
    };

    let state = AppState::new(config.ledger.transport);
    let options = FieldOptions {
        show_data_instruction: config.ledger.show_data_instruction,
        environment: config.environment.kind,
        platform: config.environment.platform,
    };
    let mut mounted = LedgerInstructionField::new(state.clone(), services, options).mount();
    info!(transport = %config.ledger.transport, environment = %options.environment, "Started.");

    let mut state_rx = state.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    show(&mounted.render());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                state_rx.borrow_and_update();
                show(&mounted.render());
            }
            Some(cmd) = cmd_rx.recv() => {
                mounted = match cmd {
                    PlatformCommand::Reload => {
                        info!("Reloading");
                        remount(mounted, None).await
                    }
                    PlatformCommand::ReopenFullScreen => {
                        info!("Reopening in full screen");
                        remount(mounted, Some(EnvironmentType::Fullscreen)).await
                    }
                };
                trace!(options = ?mounted.field().options(), "Remounted");
                show(&mounted.render());
            }
            line = stdin.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Reload => {
                        mounted = remount(mounted, None).await;
                        show(&mounted.render());
                    }
                    Input::Link(n) => {
                        let rendered = mounted.render();
                        match rendered.links().nth(n - 1) {
                            Some(action) => {
                                if let Err(e) = mounted.activate(action).await {
                                    error!(error = %e, "Link action failed");
                                }
                            }
                            None => warn!(link = n, "No such link"),
                        };
                    }
                    Input::Invalid => warn!(input = %line.trim(), "Unrecognized input"),
                }
            }
        }
    }

    trace!("Shutting down.");
    mounted.unmount().await;
    info!("Exiting.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledger_connect::{
        i18n,
        state::StateSnapshot,
        transport::{TransportError, TransportFactory},
        types::{
            HidDevice, HidDeviceFilter, TransportState, WebHidConnectedStatus,
            LEDGER_USB_VENDOR_ID,
        },
    };
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    struct FixedHid(Vec<HidDevice>);

    #[async_trait]
    impl HidBackend for FixedHid {
        async fn list_connected_devices(&self) -> Option<Vec<HidDevice>> {
            Some(self.0.clone())
        }

        async fn request_device(
            &self,
            filter: &HidDeviceFilter,
        ) -> ledger_connect::error::Result<Vec<HidDevice>> {
            Ok(self
                .0
                .iter()
                .filter(|d| filter.matches(d))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct CountingTransport {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl TransportFactory for CountingTransport {
        async fn attempt_transport_creation(&self) -> std::result::Result<bool, TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    fn mount(
        snapshot: StateSnapshot,
        devices: Vec<HidDevice>,
        transport: Arc<CountingTransport>,
    ) -> (AppState, MountedField) {
        let (cmd_tx, _cmd_rx) = mpsc::channel(1);
        let services = FieldServices {
            hid: Arc::new(FixedHid(devices)),
            transport,
            platform: Arc::new(CommandPlatform::new(cmd_tx)),
            messages: Arc::new(MessageCatalog::english()),
        };
        let state = AppState::with_snapshot(snapshot);
        let field = LedgerInstructionField::new(state.clone(), services, FieldOptions::default());
        (state, field.mount())
    }

    async fn wait_for(state: &AppState, pred: impl FnMut(&StateSnapshot) -> bool) {
        let mut rx = state.subscribe();
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(pred))
            .await
            .expect("state never reached")
            .expect("state dropped");
    }

    fn ledger() -> HidDevice {
        HidDevice {
            vendor_id: LEDGER_USB_VENDOR_ID,
            product_id: 0x4011,
            product: Some("Nano X".to_string()),
            path: None,
            interface: Some(0),
        }
    }

    #[tokio::test]
    async fn test_reload_remount_verifies_again() {
        let transport = Arc::new(CountingTransport::default());
        let (state, mounted) = mount(
            StateSnapshot {
                transport_type: TransportType::WebHid,
                webhid_connected_status: WebHidConnectedStatus::Connected,
                transport_status: TransportState::None,
            },
            vec![ledger()],
            transport.clone(),
        );
        wait_for(&state, |s| s.transport_status == TransportState::Verified).await;
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);

        let mut rx = state.subscribe();
        let mounted = remount(mounted, None).await;

        // The reset to None happens before the new mount verifies.
        tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|s| s.transport_status == TransportState::None),
        )
        .await
        .expect("transport state never reset")
        .expect("state dropped");
        wait_for(&state, |s| s.transport_status == TransportState::Verified).await;

        assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(mounted.field().options(), FieldOptions::default());
        mounted.unmount().await;
    }

    #[tokio::test]
    async fn test_reopen_remounts_in_fullscreen() {
        let (_state, mounted) = mount(
            StateSnapshot {
                transport_type: TransportType::WebHid,
                webhid_connected_status: WebHidConnectedStatus::NotConnected,
                transport_status: TransportState::None,
            },
            vec![],
            Arc::new(CountingTransport::default()),
        );
        let catalog = MessageCatalog::english();
        let open_full_screen = catalog.t(i18n::OPEN_FULL_SCREEN_FOR_WEBHID);
        let connect = catalog.t(i18n::CONNECT_VIA_WEBHID);
        assert!(mounted.render().contains_text(&open_full_screen));

        let mounted = remount(mounted, Some(EnvironmentType::Fullscreen)).await;

        assert_eq!(
            mounted.field().options().environment,
            EnvironmentType::Fullscreen
        );
        let rendered = mounted.render();
        assert!(rendered.contains_text(&connect));
        assert!(!rendered.contains_text(&open_full_screen));
        mounted.unmount().await;
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("1\n"), Input::Link(1));
        assert_eq!(parse_input(" 2 "), Input::Link(2));
        assert_eq!(parse_input("0"), Input::Invalid);
        assert_eq!(parse_input("r"), Input::Reload);
        assert_eq!(parse_input("quit"), Input::Quit);
        assert_eq!(parse_input("connect"), Input::Invalid);
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "ledger-connect",
            "--transport",
            "ledgerLive",
            "--platform",
            "firefox",
            "--show-data-instruction",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.ledger.transport, TransportType::Live);
        assert_eq!(config.environment.platform, PlatformKind::Firefox);
        assert_eq!(config.environment.kind, EnvironmentType::Popup);
        assert!(config.ledger.show_data_instruction);
    }
}
