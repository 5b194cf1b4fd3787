//! Mail templates.
//!
//! Small HTML bodies assembled inline; the provider handles layout
//! concerns like inlined CSS.

use annexe_models::{Auction, User};
use chrono::{DateTime, Utc};

/// A rendered message ready for the provider.
#[derive(Debug, Clone)]
pub struct RenderedMail {
    pub subject: String,
    pub html: String,
}

fn end_date_human(end_date: &DateTime<Utc>) -> String {
    end_date.format("%B %-d, %Y %-I:%M %p").to_string()
}

pub fn account_verification(user: &User, code: &str, frontend_url: &str) -> RenderedMail {
    RenderedMail {
        subject: "VERIFY YOUR ACCOUNT".to_string(),
        html: format!(
            "<p>Hello there,</p>\
             <p>Thanks for signing up! Please confirm your email address:</p>\
             <p><a href=\"{frontend_url}auth/verification?code={code}&email={email}\">\
             Confirm Your Account</a></p>\
             <p>If you did not sign up for this account, please ignore this email.</p>",
            email = user.email,
        ),
    }
}

pub fn welcome(user: &User, frontend_url: &str) -> RenderedMail {
    RenderedMail {
        subject: "WELCOME TO Annexe".to_string(),
        html: format!(
            "<p>Hi {name},</p>\
             <p>Your account has been successfully verified. \
             <a href=\"{frontend_url}login\">Log in</a> and start your journey with us.</p>",
            name = user.name,
        ),
    }
}

pub fn forgot_password(user: &User, code: &str, frontend_url: &str) -> RenderedMail {
    RenderedMail {
        subject: "Reset Your Password".to_string(),
        html: format!(
            "<p>Hello {name},</p>\
             <p>We received a request to reset your password:</p>\
             <p><a href=\"{frontend_url}auth/reset-password?code={code}&email={email}\">\
             Reset Your Password</a></p>\
             <p>This link is valid for 1 hour. If you did not request a password reset, \
             no further action is required.</p>",
            name = user.name,
            email = user.email,
        ),
    }
}

pub fn password_reset_success(user: &User) -> RenderedMail {
    RenderedMail {
        subject: "Your Password Has Been Successfully Reset".to_string(),
        html: format!(
            "<p>Hello {name},</p>\
             <p>Your password has been successfully reset. You can now log in using your \
             new password.</p>\
             <p>If you did not initiate this reset, please contact support immediately.</p>",
            name = user.name,
        ),
    }
}

pub fn auction_started(user: &User, auction: &Auction, frontend_url: &str) -> RenderedMail {
    RenderedMail {
        subject: "The Auction Has Begun! Place Your Bids Now".to_string(),
        html: format!(
            "<p>Hi {name},</p>\
             <p>The auction for <strong>\"{product}\"</strong> has officially begun.</p>\
             <p>Act fast: the auction closes on <strong>{closes}</strong>.</p>\
             <p><a href=\"{frontend_url}auction/{id}\">Place Your Bid Now</a></p>",
            name = user.name,
            product = auction.product_name,
            closes = end_date_human(&auction.end_date),
            id = auction.id,
        ),
    }
}

pub fn auction_winner(user: &User, auction: &Auction) -> RenderedMail {
    let amount = auction
        .winning_bid
        .as_ref()
        .map(|b| b.amount)
        .unwrap_or_default();
    RenderedMail {
        subject: format!(
            "Congratulations! You've Won the Auction: {}",
            auction.product_name
        ),
        html: format!(
            "<p>Hi {name},</p>\
             <p>Your bid for <strong>{product}</strong> was the highest. You won with a \
             winning bid of <strong>NGN {amount}</strong>.</p>\
             <p>Auction closed: {closed}</p>\
             <p><strong>Payment is required within 24 hours</strong> or your winning bid \
             becomes invalid.</p>",
            name = user.name,
            product = auction.product_name,
            closed = end_date_human(&auction.end_date),
        ),
    }
}

pub fn auction_ended(user: &User, auction: &Auction) -> RenderedMail {
    RenderedMail {
        subject: format!("Auction Ended: {}", auction.product_name),
        html: format!(
            "<p>Hi {name},</p>\
             <p>The auction for <strong>{product}</strong> has officially ended.</p>\
             <p>Unfortunately, your bid wasn't the highest this time. More auctions are \
             coming soon on Annexe.</p>",
            name = user.name,
            product = auction.product_name,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annexe_models::{Bid, UserId};
    use chrono::Duration;

    fn sample() -> (User, Auction) {
        let user = User::new("Ada", "ada@example.com", "h".to_string());
        let now = Utc::now();
        let mut auction = Auction::new(
            UserId::from("c1"),
            "Vintage camera",
            "desc",
            100.0,
            now,
            now + Duration::hours(24),
        );
        auction.apply_bid(Bid::new(user.id.clone(), 250.0));
        (user, auction)
    }

    #[test]
    fn winner_mail_includes_amount_and_product() {
        let (user, auction) = sample();
        let mail = auction_winner(&user, &auction);
        assert!(mail.subject.contains("Vintage camera"));
        assert!(mail.html.contains("NGN 250"));
    }

    #[test]
    fn verification_mail_links_the_code() {
        let (user, _) = sample();
        let mail = account_verification(&user, "123456", "https://annexe.example/");
        assert!(mail.html.contains("code=123456"));
        assert!(mail.html.contains("ada@example.com"));
    }
}
