//! Cookie session bootstrap and login.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use tracing::debug;

use super::{check_status, Portal};
use crate::config::Credentials;
use crate::error::Result;


/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;


/// An authenticated cookie jar and the HTTP client bound to it.
///
/// Every hop of a redirect chain stores its `Set-Cookie` headers in the jar,
/// so cookies the portal issues mid-chain during login are kept.
#[derive(Clone)]
pub struct Session {
    http: Client,
    jar: Arc<Jar>,
}


impl Session {
    fn new(portal: &Portal) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .default_headers(portal.headers()?)
            .cookie_provider(Arc::clone(&jar))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { http, jar })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// The `Cookie` header this session sends to `url`, if any.
    pub fn cookie_header(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        self.jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(String::from))
    }
}


/// Log in and return a fresh session.
pub async fn authenticate(portal: &Portal, credentials: &Credentials) -> Result<Session> {
    let session = Session::new(portal)?;

    let url = portal.session_url();
    let response = session.http.get(&url).send().await?;
    debug!(%url, status = %response.status(), "session bootstrap");
    check_status(response.status())?;

    let url = portal.login_url();
    let form = [
        ("email", credentials.username.as_str()),
        ("password", credentials.password.expose_secret()),
    ];
    let response = session.http.post(&url).form(&form).send().await?;
    debug!(
        %url,
        status = %response.status(),
        landed = %response.url(),
        "login"
    );
    check_status(response.status())?;

    Ok(session)
}
