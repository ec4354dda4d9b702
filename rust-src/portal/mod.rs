//! Session-based access to a WaterSmart portal.
//!
//! The portal is an HTML application: a session cookie is bootstrapped from
//! the logout page, credentials are posted to the login form, and the chart
//! endpoints then answer with JSON as long as the cookies travel along.

mod fetcher;
mod session;

pub use fetcher::fetch_dataset;
pub use session::{authenticate, Session};

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;

use crate::config::Provider;
use crate::error::{Error, Result};
use crate::models::Metric;


const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const ACCEPT_ENCODING: &str = "gzip, deflate, br";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// The portal checks this (misspelled) header rather than `Referer`.
const REFERRER: &str = "referrer";


/// Endpoints and request signature of one provider's portal.
#[derive(Debug, Clone)]
pub struct Portal {
    provider: Provider,
}


impl Portal {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Page that hands out the initial session cookie.
    pub fn session_url(&self) -> String {
        format!("{}/logout", self.provider.root_url())
    }

    pub fn login_url(&self) -> String {
        format!("{}/logout/login?forceEmail=1", self.provider.root_url())
    }

    pub fn home_url(&self) -> String {
        format!("{}/home/index", self.provider.root_url())
    }

    /// Chart endpoint for a metric.
    pub fn data_url(&self, metric: Metric) -> String {
        let root = self.provider.root_url();
        match metric {
            Metric::Daily => format!(
                "{root}/rest/v1/Chart/weatherConsumptionChart?module=portal&commentary=full"
            ),
            Metric::Hourly => format!("{root}/rest/v1/Chart/RealTimeChart"),
        }
    }

    /// Browser-like headers sent with every request.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_ENCODING,
            HeaderValue::from_static(ACCEPT_ENCODING),
        );
        headers.insert(
            HeaderName::from_static(REFERRER),
            HeaderValue::from_str(&self.home_url())
                .map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.home_url())))?,
        );
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        Ok(headers)
    }
}


/// Map a portal response status onto the error taxonomy.
pub fn check_status(status: StatusCode) -> Result<()> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::UNAUTHORIZED => Err(Error::NotAuthenticated),
        StatusCode::FORBIDDEN => Err(Error::Unauthorized),
        StatusCode::INTERNAL_SERVER_ERROR => Err(Error::ServerError),
        other => Err(Error::UnknownStatus(other.as_u16())),
    }
}
