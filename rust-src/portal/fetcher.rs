//! Authenticated chart downloads.

use serde_json::Value;
use tracing::debug;

use super::{check_status, Portal, Session};
use crate::error::Result;
use crate::models::Metric;


/// GET the chart endpoint for `metric` and decode its JSON body.
pub async fn fetch_dataset(session: &Session, portal: &Portal, metric: Metric) -> Result<Value> {
    let url = portal.data_url(metric);
    let response = session.http().get(&url).send().await?;
    debug!(%metric, %url, status = %response.status(), "chart request");
    check_status(response.status())?;

    Ok(response.json::<Value>().await?)
}
