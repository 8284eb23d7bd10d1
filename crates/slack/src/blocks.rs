use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    #[serde(rename = "type")]
    kind: &'static str,
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: "button",
            action_id: action_id.into(),
            text: TextObject::plain(label),
            url: None,
            value: None,
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: TextObject },
    Section { text: TextObject },
    Actions { elements: Vec<ButtonElement> },
    Divider,
}

impl Block {
    pub fn header(text: impl Into<String>) -> Self {
        Self::Header { text: TextObject::plain(text) }
    }

    pub fn section(text: impl Into<String>) -> Self {
        Self::Section { text: TextObject::mrkdwn(text) }
    }
}

/// A complete message payload: fallback text plus Block Kit blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlackMessage {
    pub text: String,
    pub blocks: Vec<Block>,
}

impl SlackMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), blocks: Vec::new() }
    }

    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }
}

/// View model for one QuickBooks account line in a command response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountSummary {
    pub name: String,
    pub account_type: String,
    pub balance: Option<String>,
    pub currency: Option<String>,
}

pub fn accounts_message(accounts: &[AccountSummary]) -> SlackMessage {
    if accounts.is_empty() {
        return SlackMessage::new("No accounts found in QuickBooks")
            .block(Block::section("No accounts found in your QuickBooks company."));
    }

    let mut listing = String::new();
    for account in accounts {
        listing.push_str(&format!("• *{}* ({})", account.name, account.account_type));
        if let Some(balance) = &account.balance {
            listing.push_str(&format!(
                " - Balance: {} {}",
                balance,
                account.currency.as_deref().unwrap_or("USD")
            ));
        }
        listing.push('\n');
    }

    SlackMessage::new("Your QuickBooks Accounts")
        .block(Block::header("Your QuickBooks Accounts"))
        .block(Block::section(listing))
}

pub fn profit_and_loss_message(
    start_date: &str,
    end_date: &str,
    net_income: Option<&str>,
) -> SlackMessage {
    let summary = match net_income {
        Some(value) => format!(
            "Profit and loss for *{start_date}* to *{end_date}*\nNet income: *{value}*"
        ),
        None => format!(
            "Profit and loss for *{start_date}* to *{end_date}* is ready, but the report \
             carried no net income total."
        ),
    };

    SlackMessage::new("QuickBooks Profit & Loss")
        .block(Block::header("Profit & Loss"))
        .block(Block::section(summary))
}

pub fn connect_prompt(authorization_url: &str) -> SlackMessage {
    SlackMessage::new("Connect your QuickBooks account")
        .block(Block::section(
            "You need to connect your QuickBooks account before running finance commands.",
        ))
        .block(Block::Actions {
            elements: vec![ButtonElement::new("connect_quickbooks", "Connect QuickBooks")
                .url(authorization_url)
                .value("connect_quickbooks")],
        })
}

pub fn error_message(text: impl Into<String>) -> SlackMessage {
    let text = text.into();
    SlackMessage::new(text.clone()).block(Block::section(text))
}

pub fn help_message() -> SlackMessage {
    SlackMessage::new("Finance commands")
        .block(Block::header("Finance commands"))
        .block(Block::section(
            "• `/finance accounts` - list your QuickBooks accounts\n\
             • `/finance pnl [start] [end]` - profit and loss report (dates as YYYY-MM-DD)\n\
             • `/finance connect` - connect your QuickBooks account\n\
             • `/finance help` - this message",
        ))
}
