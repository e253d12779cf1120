// Status and chart set management endpoints

use tracing::debug;

use crate::client::ChartClient;
use crate::error::Error;
use crate::models::{ChartSetBody, DataBody, ServiceStatus};

impl ChartClient {
    /// Fetch the full service status tree.
    ///
    /// `GET status/`
    pub async fn status(&self) -> Result<ServiceStatus, Error> {
        let url = self.url("status/")?;
        let body: DataBody<ServiceStatus> = self.get(url).await?;
        Ok(body.data)
    }

    /// Remove a chart set from disk.
    ///
    /// `POST upload/deleteset` with form field `chartSet`. Returns the
    /// name echoed by the service.
    pub async fn delete_chart_set(&self, name: &str) -> Result<String, Error> {
        let url = self.url("upload/deleteset")?;
        debug!(name, "deleting chart set");
        let body: ChartSetBody = self.post_form(url, &[("chartSet", name)]).await?;
        Ok(body.chart_set.unwrap_or_else(|| name.to_owned()))
    }
}
