use rust_decimal::Decimal;
use uuid::Uuid;

/// What a customer is being told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Deposit,
    Withdrawal,
    LoanRequest,
    LoanApproval,
}

impl Notice {
    pub fn subject(self) -> &'static str {
        match self {
            Notice::Deposit => "Deposit Successful",
            Notice::Withdrawal => "Withdrawal Message",
            Notice::LoanRequest => "Loan Request Message",
            Notice::LoanApproval => "Loan Approval",
        }
    }

    pub fn template(self) -> &'static str {
        match self {
            Notice::Deposit => "transactions/deposit_email.html",
            Notice::Withdrawal => "transactions/withdrawal_email.html",
            Notice::LoanRequest => "transactions/loan_email.html",
            Notice::LoanApproval => "transactions/admin_email.html",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub subject: &'static str,
    pub template: &'static str,
}

impl Notification {
    pub fn new(user_id: Uuid, amount: Decimal, notice: Notice) -> Self {
        Notification {
            user_id,
            amount,
            subject: notice.subject(),
            template: notice.template(),
        }
    }
}

/// Delivers customer notifications. Delivery is fire-and-forget: the caller
/// has already committed and never learns whether it worked.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log instead of sending them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            target: "bank_ledger::notify",
            user_id = %notification.user_id,
            amount = %notification.amount,
            template = notification.template,
            "{}",
            notification.subject
        );
    }
}
