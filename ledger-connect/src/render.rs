//! Instruction rendering.
//!
//! A pure mapping from the current state to the lines shown to the user.
//! The same inputs always produce the same lines; links carry an
//! [`LinkAction`] that the field carries out when the user activates it.

use std::fmt;

use crate::{
    i18n::{self, Translate},
    state::StateSnapshot,
    types::{
        EnvironmentType, PlatformKind, TransportState, TransportType, WebHidConnectedStatus,
    },
};

/// Everything the renderer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    pub transport_type: TransportType,
    pub webhid_connected_status: WebHidConnectedStatus,
    pub transport_status: TransportState,
    /// Show the "enable contract data / blind signing" step
    pub show_data_instruction: bool,
    pub environment: EnvironmentType,
    pub platform: PlatformKind,
}

impl RenderContext {
    pub fn new(
        snapshot: StateSnapshot,
        show_data_instruction: bool,
        environment: EnvironmentType,
        platform: PlatformKind,
    ) -> Self {
        Self {
            transport_type: snapshot.transport_type,
            webhid_connected_status: snapshot.webhid_connected_status,
            transport_status: snapshot.transport_status,
            show_data_instruction,
            environment,
            platform,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextColor {
    #[default]
    Default,
    Warning,
}

/// What activating a link does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Reload, or reopen full-screen, after the user closes other apps
    CloseOtherApps,
    /// Request HID access, or reopen full-screen to be able to
    ConnectWebHid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionLine {
    Text {
        text: String,
        color: TextColor,
    },
    Link {
        label: String,
        action: LinkAction,
        color: TextColor,
    },
}

impl InstructionLine {
    fn text(text: String) -> Self {
        InstructionLine::Text {
            text,
            color: TextColor::Default,
        }
    }

    fn step(text: String) -> Self {
        Self::text(format!("• {}", text))
    }

    pub fn action(&self) -> Option<LinkAction> {
        match self {
            InstructionLine::Link { action, .. } => Some(*action),
            InstructionLine::Text { .. } => None,
        }
    }
}

impl fmt::Display for InstructionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionLine::Text { text, .. } => write!(f, "{}", text),
            InstructionLine::Link { label, .. } => write!(f, "[{}]", label),
        }
    }
}

/// Rendered instruction banner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instructions {
    pub lines: Vec<InstructionLine>,
}

impl Instructions {
    /// Links in display order.
    pub fn links(&self) -> impl Iterator<Item = LinkAction> + '_ {
        self.lines.iter().filter_map(InstructionLine::action)
    }

    pub fn has_link(&self, action: LinkAction) -> bool {
        self.links().any(|a| a == action)
    }

    /// Whether any line or link label reads exactly `text`.
    pub fn contains_text(&self, text: &str) -> bool {
        self.lines.iter().any(|line| match line {
            InstructionLine::Text { text: t, .. } => t == text,
            InstructionLine::Link { label, .. } => label == text,
        })
    }
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut link_number = 0;
        for line in &self.lines {
            match line {
                InstructionLine::Link { .. } => {
                    link_number += 1;
                    writeln!(f, "  {}) {}", link_number, line)?;
                }
                InstructionLine::Text { .. } => writeln!(f, "{}", line)?,
            }
        }
        Ok(())
    }
}

/// Render the instruction lines for `ctx`.
pub fn render_instructions(ctx: &RenderContext, t: &dyn Translate) -> Instructions {
    let using_ledger_live = ctx.transport_type == TransportType::Live;
    let using_webhid = ctx.transport_type == TransportType::WebHid;
    let fullscreen = ctx.environment.is_fullscreen();

    let mut lines = vec![InstructionLine::text(t.t(i18n::HEADER))];

    if using_ledger_live && !ctx.platform.is_firefox() {
        lines.push(InstructionLine::step(t.t(i18n::STEP_ONE)));
        lines.push(InstructionLine::step(t.t(i18n::STEP_TWO)));
    }

    lines.push(InstructionLine::step(t.t(i18n::STEP_THREE)));

    if ctx.show_data_instruction {
        lines.push(InstructionLine::step(t.t(i18n::STEP_FOUR)));
    }

    if ctx.transport_status == TransportState::DeviceOpenFailure {
        lines.push(InstructionLine::Link {
            label: t.t(i18n::CLOSE_OTHER_APPS),
            action: LinkAction::CloseOtherApps,
            color: TextColor::Default,
        });
    }

    if using_webhid && ctx.webhid_connected_status == WebHidConnectedStatus::NotConnected {
        let label = if fullscreen {
            t.t(i18n::CONNECT_VIA_WEBHID)
        } else {
            t.t(i18n::OPEN_FULL_SCREEN_FOR_WEBHID)
        };
        lines.push(InstructionLine::Link {
            label,
            action: LinkAction::ConnectWebHid,
            color: TextColor::Warning,
        });
    }

    Instructions { lines }
}
