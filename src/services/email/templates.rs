//! Fully-inlined transactional email HTML. Every template shares one frame:
//! header with the embedded logo, a body block, and a footer whose
//! "questions" and "automatic email" notes are per-template.

use crate::config::environment::AppEnv;

// Placeholder mark, swapped for the real logo asset at build time by ops.
const LOGO_PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const BRAND_COLOR: &str = "#1f6f54";

#[derive(Debug, Clone)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
}

/// Builds tenant-aware absolute links. Production resolves to the tenant's
/// subdomain; development targets the local dev server's hash router.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    env: AppEnv,
    base_domain: String,
    dev_port: u16,
}

impl LinkBuilder {
    pub fn new(env: AppEnv, base_domain: String, dev_port: u16) -> Self {
        Self {
            env,
            base_domain,
            dev_port,
        }
    }

    pub fn tenant_link(&self, tenant_id: &str, path: &str) -> String {
        match self.env {
            AppEnv::Production => format!("https://{tenant_id}.{}{path}", self.base_domain),
            AppEnv::Development => {
                format!("http://localhost:{}/#/{tenant_id}{path}", self.dev_port)
            }
        }
    }
}

fn frame(body: &str, questions_note: bool, automatic_note: bool) -> String {
    let questions = if questions_note {
        r#"<p style="color:#6b7280;font-size:13px;margin:16px 0 0;">Questions? Just reply to this email.</p>"#
    } else {
        ""
    };
    let automatic = if automatic_note {
        r#"<p style="color:#9ca3af;font-size:12px;margin:8px 0 0;">This is an automatic email, sent because of activity on your account.</p>"#
    } else {
        ""
    };

    format!(
        r#"<!doctype html>
<html>
  <body style="margin:0;padding:0;background:#f3f4f6;font-family:Helvetica,Arial,sans-serif;">
    <div style="max-width:520px;margin:0 auto;padding:32px 16px;">
      <div style="text-align:center;padding-bottom:24px;">
        <img src="data:image/png;base64,{LOGO_PNG_BASE64}" alt="Courtpass" width="48" height="48" style="border-radius:8px;" />
      </div>
      <div style="background:#ffffff;border-radius:12px;padding:32px;">
        {body}
      </div>
      <div style="text-align:center;padding-top:24px;">
        {questions}
        {automatic}
      </div>
    </div>
  </body>
</html>"#
    )
}

fn button(href: &str, label: &str) -> String {
    format!(
        r#"<a href="{href}" style="display:inline-block;background:{BRAND_COLOR};color:#ffffff;text-decoration:none;padding:12px 24px;border-radius:8px;font-weight:bold;">{label}</a>"#
    )
}

/// The coach's PIN rendered as six separate decorated digit boxes.
fn pin_digit_boxes(pin: &str) -> String {
    pin.chars()
        .map(|digit| {
            format!(
                r#"<span style="display:inline-block;width:36px;height:44px;line-height:44px;margin:0 3px;background:#f3f4f6;border:1px solid #d1d5db;border-radius:8px;font-size:22px;font-weight:bold;text-align:center;">{digit}</span>"#
            )
        })
        .collect()
}

pub fn verify_email(link: &str) -> EmailContent {
    let body = format!(
        r#"<h1 style="font-size:20px;margin:0 0 16px;">Confirm your email address</h1>
<p style="color:#374151;">Thanks for creating a club on Courtpass. Click the button below to verify your email address. The link is valid for 24 hours.</p>
<p style="text-align:center;margin:24px 0;">{}</p>
<p style="color:#6b7280;font-size:13px;">If you did not create an account, you can ignore this email.</p>"#,
        button(link, "Verify email")
    );
    EmailContent {
        subject: "Verify your email address".to_string(),
        html: frame(&body, true, true),
    }
}

pub fn password_reset(link: &str) -> EmailContent {
    let body = format!(
        r#"<h1 style="font-size:20px;margin:0 0 16px;">Reset your password</h1>
<p style="color:#374151;">We received a request to reset your password. The link below is valid for one hour.</p>
<p style="text-align:center;margin:24px 0;">{}</p>
<p style="color:#6b7280;font-size:13px;">If you did not request a reset, no action is needed; your password is unchanged.</p>"#,
        button(link, "Choose a new password")
    );
    EmailContent {
        subject: "Reset your password".to_string(),
        html: frame(&body, false, true),
    }
}

pub fn two_factor_enabled() -> EmailContent {
    let body = r#"<h1 style="font-size:20px;margin:0 0 16px;">Two-factor authentication enabled</h1>
<p style="color:#374151;">Two-factor authentication was just enabled on your account. From now on, signing in requires a code from your authenticator app.</p>
<p style="color:#6b7280;font-size:13px;">If this was not you, reset your password immediately and contact support.</p>"#;
    EmailContent {
        subject: "Two-factor authentication was enabled".to_string(),
        html: frame(body, true, true),
    }
}

pub fn coach_welcome(club_name: &str, username: &str, pin: &str, login_link: &str) -> EmailContent {
    let body = format!(
        r#"<h1 style="font-size:20px;margin:0 0 16px;">Welcome to {club_name}</h1>
<p style="color:#374151;">An administrator created a coach account for you. Sign in with your username and PIN:</p>
<p style="color:#374151;margin:16px 0 4px;">Username</p>
<p style="font-size:18px;font-weight:bold;margin:0 0 16px;">{username}</p>
<p style="color:#374151;margin:0 0 8px;">PIN</p>
<p style="margin:0 0 24px;">{}</p>
<p style="text-align:center;margin:24px 0;">{}</p>
<p style="color:#6b7280;font-size:13px;">Keep your PIN to yourself. You can change it after signing in.</p>"#,
        pin_digit_boxes(pin),
        button(login_link, "Sign in")
    );
    EmailContent {
        subject: format!("Your coach account at {club_name}"),
        html: frame(&body, true, false),
    }
}

pub fn pin_reset(username: &str, link: &str) -> EmailContent {
    let body = format!(
        r#"<h1 style="font-size:20px;margin:0 0 16px;">Reset your PIN</h1>
<p style="color:#374151;">A PIN reset was requested for the coach account <strong>{username}</strong>. The link below is valid for one hour.</p>
<p style="text-align:center;margin:24px 0;">{}</p>
<p style="color:#6b7280;font-size:13px;">If you did not request this, you can ignore this email.</p>"#,
        button(link, "Choose a new PIN")
    );
    EmailContent {
        subject: "Reset your PIN".to_string(),
        html: frame(&body, false, true),
    }
}

pub fn cold_outreach(club_name: &str, signup_link: &str) -> EmailContent {
    let body = format!(
        r#"<h1 style="font-size:20px;margin:0 0 16px;">Booking for {club_name}, without the spreadsheets</h1>
<p style="color:#374151;">Courtpass gives clubs like {club_name} online court booking, coach scheduling and member self-service in one place. Setup takes a few minutes.</p>
<p style="text-align:center;margin:24px 0;">{}</p>"#,
        button(signup_link, "Try it with your club")
    );
    EmailContent {
        subject: format!("Court booking for {club_name}"),
        html: frame(&body, true, false),
    }
}

/// Operator-facing note, deliberately plain.
pub fn signup_notification(admin_email: &str, tenant_id: &str) -> EmailContent {
    let body = format!(
        r#"<h1 style="font-size:20px;margin:0 0 16px;">New club signup</h1>
<p style="color:#374151;">Tenant <strong>{tenant_id}</strong> was just provisioned by {admin_email}.</p>"#
    );
    EmailContent {
        subject: format!("New club signup: {tenant_id}"),
        html: frame(&body, false, false),
    }
}
