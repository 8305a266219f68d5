use crate::config::Config;
use crate::database::DbPool;
use crate::models::ConsoleApp;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub enum MenuAction {
    GenerateEmailQueue,
    GenerateWhatsappQueue,
    RunEmailDispatch,
    RunWhatsappDispatch,
    ShowStats,
    ShowHistory,
    SetDailyLimit,
    EnvironmentCheck,
    Exit,
}

impl std::fmt::Display for MenuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuAction::GenerateEmailQueue => write!(f, "📬 Generate email queue"),
            MenuAction::GenerateWhatsappQueue => write!(f, "💬 Generate WhatsApp queue"),
            MenuAction::RunEmailDispatch => write!(f, "📧 Run email dispatch"),
            MenuAction::RunWhatsappDispatch => write!(f, "📱 Run WhatsApp dispatch"),
            MenuAction::ShowStats => write!(f, "📊 Show database statistics"),
            MenuAction::ShowHistory => write!(f, "📜 Show recent dispatch history"),
            MenuAction::SetDailyLimit => write!(f, "⚙️  Set channel daily limit"),
            MenuAction::EnvironmentCheck => write!(f, "🔍 Check provider environment"),
            MenuAction::Exit => write!(f, "🚪 Exit"),
        }
    }
}

impl ConsoleApp {
    pub fn new(config: Config, db_pool: DbPool) -> Self {
        Self { config, db_pool }
    }
}
