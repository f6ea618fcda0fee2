//! Operator command parsing.

use herald_core::RecipientId;

/// A recognized slash command. Anything else is a free message, routed to
/// the sender's active conversation flow (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Admin,
    Stats,
    AddAdmin(RecipientId),
    RemoveAdmin(RecipientId),
    Broadcast,
    ConfirmBroadcast,
    CancelBroadcast,
    Schedule,
    CancelSchedule,
}

impl Command {
    /// Parse a message text. Returns `None` for anything that is not a
    /// recognized command — including `/addadmin` with a malformed id, which
    /// is treated as an ordinary message rather than an error.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.trim().split_whitespace();
        let head = words.next()?;
        if !head.starts_with('/') {
            return None;
        }
        // "/stats@my_bot" arrives in group chats
        let name = head[1..].split('@').next().unwrap_or_default();

        match name {
            "start" => Some(Self::Start),
            "admin" => Some(Self::Admin),
            "stats" => Some(Self::Stats),
            "addadmin" => words.next()?.parse().ok().map(|id: i64| Self::AddAdmin(RecipientId(id))),
            "removeadmin" => {
                words.next()?.parse().ok().map(|id: i64| Self::RemoveAdmin(RecipientId(id)))
            }
            "broadcast" => Some(Self::Broadcast),
            "confirmbroadcast" => Some(Self::ConfirmBroadcast),
            "cancelbroadcast" => Some(Self::CancelBroadcast),
            "schedule" => Some(Self::Schedule),
            "cancelschedule" => Some(Self::CancelSchedule),
            _ => None,
        }
    }
}
