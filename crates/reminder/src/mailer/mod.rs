//! Email delivery: deadline summaries and password-recovery notices.

use lettre::message::SinglePart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::deadline::{ClassificationSnapshot, ClassifiedAssignment, CANONICAL_TIME_FORMAT};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Seam between the decision engine and actual delivery.
pub trait ReminderSink {
    fn send_reminder(
        &self,
        snapshot: &ClassificationSnapshot,
        to: &str,
    ) -> impl std::future::Future<Output = Result<(), DeliveryError>> + Send;
}

#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    /// When false, messages are rendered and logged but never sent.
    pub send_email: bool,
}

pub struct Mailer {
    config: MailerConfig,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
        // Port 465 is implicit TLS; anything else goes through STARTTLS.
        let builder = if self.config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
        };
        Ok(builder.port(self.config.port).credentials(creds).build())
    }

    async fn deliver(&self, to: &str, subject: &str, html: String) -> Result<(), DeliveryError> {
        if !self.config.send_email {
            info!(to, subject, "Email sending disabled; skipping delivery");
            return Ok(());
        }

        let message = Message::builder()
            .from(self.config.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .singlepart(SinglePart::html(html))?;

        self.transport()?.send(message).await?;
        info!(to, subject, "Email sent");
        Ok(())
    }

    pub async fn send_recovery(&self, to: &str, link: &str) -> Result<(), DeliveryError> {
        self.deliver(to, "[新海天提醒] 登录失败，请更新密码", render_recovery(link))
            .await
    }
}

impl ReminderSink for Mailer {
    async fn send_reminder(
        &self,
        snapshot: &ClassificationSnapshot,
        to: &str,
    ) -> Result<(), DeliveryError> {
        self.deliver(to, "[新海天提醒] 即将到期的作业汇总", render_reminder(snapshot))
            .await
    }
}

const SECTION_STYLES: [(&str, &str, &str); 4] = [
    ("紧急提醒", "#d9363e", "#ffe6e6"),
    ("普通提醒", "#4a90e2", "#f9f9f9"),
    ("后续作业", "#8a8a8a", "#f5f5f5"),
    ("已过截止", "#555555", "#eeeeee"),
];

/// Renders the reminder summary, urgent section first, then normal, then
/// the informational buckets. Empty sections are omitted.
fn render_reminder(snapshot: &ClassificationSnapshot) -> String {
    let mut body = String::from(
        r#"<html>
<body style="font-family: Arial, sans-serif; background-color: #fafafa; color: #333;">
  <div style="max-width: 600px; margin: 20px auto; padding: 20px; background-color: #ffffff; border-radius: 8px;">
    <h2 style="text-align: center; color: #4a90e2;">即将到期的作业提醒</h2>
    <p>你有下列课程的作业需要关注：</p>
"#,
    );

    let sections = [
        (&snapshot.urgent, SECTION_STYLES[0]),
        (&snapshot.normal, SECTION_STYLES[1]),
        (&snapshot.out_of_threshold, SECTION_STYLES[2]),
        (&snapshot.late, SECTION_STYLES[3]),
    ];

    for (entries, (heading, accent, background)) in sections {
        if entries.is_empty() {
            continue;
        }
        body.push_str(&format!("    <h3 style=\"color: {accent};\">{heading}</h3>\n"));
        for entry in entries {
            body.push_str(&render_entry(entry, accent, background));
        }
    }

    body.push_str(
        r#"    <p>不要忘了交作业哦~</p>
  </div>
</body>
</html>
"#,
    );
    body
}

fn render_entry(entry: &ClassifiedAssignment, accent: &str, background: &str) -> String {
    format!(
        "    <div style=\"margin-bottom: 15px; padding: 10px; border-left: 4px solid {accent}; background-color: {background}; border-radius: 5px;\">\n      <strong>课程：</strong> {}<br>\n      <strong>作业标题：</strong> {}<br>\n      <strong>截止时间：</strong> {}<br>\n    </div>\n",
        entry.course_name,
        entry.title,
        entry.end_time.format(CANONICAL_TIME_FORMAT),
    )
}

fn render_recovery(link: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <div style="max-width: 600px; margin: 20px auto; padding: 20px;">
    <h2 style="color: #d9363e;">登录失败，请更新密码</h2>
    <p>系统使用存储的密码登录课程平台失败，账号可能已被锁定或密码已修改。</p>
    <p>请通过以下链接确认并更新密码（此邮件在密码确认前只发送一次）：</p>
    <p><a href="{link}">{link}</a></p>
  </div>
</body>
</html>
"#
    )
}
