// Settings endpoints
//
// Everything under `settings/`: readiness, current values, submission,
// restart, chart set enablement, and the two-step fingerprint export. The
// static field catalog (`settings.json`) lives here too since it describes
// the same values.

use std::collections::BTreeMap;

use tracing::debug;

use crate::client::ChartClient;
use crate::error::Error;
use crate::models::{
    DataBody, EnableBody, FieldCatalog, FingerprintCreated, FingerprintData, ReadyBody, SetBody,
};

impl ChartClient {
    /// Poll the service readiness flag.
    ///
    /// `GET settings/ready`
    pub async fn ready(&self) -> Result<bool, Error> {
        let url = self.url("settings/ready")?;
        let body: ReadyBody = self.get(url).await?;
        Ok(body.ready)
    }

    /// Fetch current setting values.
    ///
    /// `GET settings/get`
    pub async fn settings(&self) -> Result<BTreeMap<String, f64>, Error> {
        let url = self.url("settings/get")?;
        debug!("fetching current settings");
        let body: DataBody<BTreeMap<String, f64>> = self.get(url).await?;
        Ok(body.data)
    }

    /// Submit changed settings as a urlencoded form.
    ///
    /// `POST settings/set`. Returns the service's `hasChanged` flag.
    pub async fn update_settings(&self, changes: &BTreeMap<String, f64>) -> Result<bool, Error> {
        let url = self.url("settings/set")?;
        let form: Vec<(&str, String)> = changes
            .iter()
            .map(|(name, value)| (name.as_str(), format_value(*value)))
            .collect();
        debug!(count = form.len(), "submitting settings");
        let body: SetBody = self.post_form(url, &form).await?;
        Ok(body.has_changed)
    }

    /// Ask the service to restart.
    ///
    /// `GET settings/restart`
    pub async fn restart(&self) -> Result<(), Error> {
        let url = self.url("settings/restart")?;
        debug!("triggering restart");
        let _: serde_json::Value = self.get(url).await?;
        Ok(())
    }

    /// Enable or disable a chart set.
    ///
    /// `GET settings/enable?chartSet=&enable=0|1`. Returns the `changed` flag.
    pub async fn enable_chart_set(&self, name: &str, enable: bool) -> Result<bool, Error> {
        let flag = if enable { "1" } else { "0" };
        let url = self.url_with_query("settings/enable", &[("chartSet", name), ("enable", flag)])?;
        debug!(name, enable, "toggling chart set");
        let body: EnableBody = self.get(url).await?;
        Ok(body.changed)
    }

    /// Create a fingerprint file on the service and return its name.
    ///
    /// `GET settings/createfingerprint[?forDongle=1]`
    pub async fn create_fingerprint(&self, for_dongle: bool) -> Result<String, Error> {
        let query: &[(&str, &str)] = if for_dongle { &[("forDongle", "1")] } else { &[] };
        let url = self.url_with_query("settings/createfingerprint", query)?;
        debug!(for_dongle, "creating fingerprint");
        let body: FingerprintCreated = self.get(url).await?;
        body.file_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::application("no fileName returned"))
    }

    /// Fetch a previously created fingerprint as base64.
    ///
    /// `GET settings/loadfingerprint?fileName=`
    pub async fn load_fingerprint(&self, file_name: &str) -> Result<String, Error> {
        let url = self.url_with_query("settings/loadfingerprint", &[("fileName", file_name)])?;
        debug!(file_name, "loading fingerprint");
        let body: FingerprintData = self.get(url).await?;
        body.data
            .filter(|data| !data.is_empty())
            .ok_or_else(|| Error::application("fingerprint has no data"))
    }

    /// Fetch the static field descriptors.
    ///
    /// `GET settings.json`, envelope check disabled.
    pub async fn field_catalog(&self) -> Result<FieldCatalog, Error> {
        let url = self.url("settings.json")?;
        self.get_unchecked(url).await
    }
}

/// Integral values go out without a fraction so integer fields parse server side.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::format_value;

    #[test]
    fn integral_values_have_no_fraction() {
        assert_eq!(format_value(10.0), "10");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(0.25), "0.25");
    }
}
