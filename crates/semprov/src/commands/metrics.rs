//! Statistics gathering, printed as samples or InfluxDB line protocol, or
//! written straight to an InfluxDB database.

use secrecy::SecretString;
use tabled::Tabled;
use tracing::info;
use url::Url;

use semprov_api::InfluxWriter;
use semprov_config::Settings;
use semprov_core::{Cluster, CoreError, MetricSample, StatsKind};

use crate::cli::{GlobalOpts, MetricsArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct SampleRow {
    #[tabled(rename = "Measurement")]
    measurement: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Fields")]
    fields: usize,
}

impl From<&MetricSample> for SampleRow {
    fn from(s: &MetricSample) -> Self {
        Self {
            measurement: s.measurement.clone(),
            tags: s
                .tags
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" "),
            fields: s.fields.len(),
        }
    }
}

/// Requested statistics blocks; all of them when no flag is given.
fn kinds(args: &MetricsArgs) -> Vec<StatsKind> {
    let picked: Vec<StatsKind> = [
        (args.clients, StatsKind::Clients),
        (args.client_spools, StatsKind::ClientSpools),
        (args.vpns, StatsKind::Vpns),
        (args.spool, StatsKind::Spool),
    ]
    .into_iter()
    .filter_map(|(on, kind)| on.then_some(kind))
    .collect();
    if picked.is_empty() {
        vec![
            StatsKind::Clients,
            StatsKind::ClientSpools,
            StatsKind::Vpns,
            StatsKind::Spool,
        ]
    } else {
        picked
    }
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// One sample as a line: `measurement,tag=v field=1i <ns>`.
fn line_protocol(sample: &MetricSample) -> String {
    let tags: String = sample
        .tags
        .iter()
        .map(|(key, value)| format!(",{}={}", escape(key), escape(value)))
        .collect();
    let fields = sample
        .fields
        .iter()
        .map(|(key, value)| format!("{}={value}i", escape(key)))
        .collect::<Vec<_>>()
        .join(",");
    let mut line = format!("{}{tags} {fields}", escape(&sample.measurement));
    if let Some(ns) = sample.time.timestamp_nanos_opt() {
        line.push(' ');
        line.push_str(&ns.to_string());
    }
    line
}

/// Base URL of the InfluxDB server, when `--influxdb-host` is given.
fn influx_base(args: &MetricsArgs) -> Result<Option<Url>, CliError> {
    let Some(host) = &args.influxdb_host else {
        return Ok(None);
    };
    let url = Url::parse(&format!("http://{host}:{}/", args.influxdb_port)).map_err(|e| CliError::Validation {
        field: "--influxdb-host".into(),
        reason: e.to_string(),
    })?;
    Ok(Some(url))
}

/// Writer over the environment's transport, so the database is reached with
/// the same certificate policy and timeout as the appliances.
fn influx_writer(
    settings: &Settings,
    env: &str,
    args: &MetricsArgs,
    global: &GlobalOpts,
) -> Result<Option<InfluxWriter>, CliError> {
    let Some(base) = influx_base(args)? else {
        return Ok(None);
    };
    let transport = settings
        .cluster_config(env, global.testmode)?
        .transport()
        .map_err(CoreError::from)?;
    let mut writer = transport
        .influx(&base, args.influxdb_db.as_str())
        .map_err(CoreError::from)?;
    if let Some(user) = &args.influxdb_user {
        let password = SecretString::from(args.influxdb_pass.clone().unwrap_or_default());
        writer = writer.with_credentials(user.as_str(), password);
    }
    Ok(Some(writer))
}

pub async fn handle(
    cluster: &Cluster,
    settings: &Settings,
    env: &str,
    args: &MetricsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let writer = influx_writer(settings, env, args, global)?;
    if let Some(writer) = &writer {
        writer.ensure_database().await.map_err(CoreError::from)?;
        if args.set_retention {
            info!(db = writer.database(), duration = %args.retention, "altering default retention policy");
            writer
                .set_default_retention(&args.retention)
                .await
                .map_err(CoreError::from)?;
        }
    }

    let mut samples = Vec::new();
    for kind in kinds(args) {
        samples.extend(
            cluster
                .stats(kind, &args.filter)
                .await?
                .into_iter()
                .filter(|s| !s.fields.is_empty()),
        );
    }

    if let Some(writer) = writer {
        if samples.is_empty() {
            info!(environment = env, "no samples to write");
            return Ok(());
        }
        let body = samples.iter().map(line_protocol).collect::<Vec<_>>().join("\n");
        writer.write(&body).await.map_err(CoreError::from)?;
        info!(environment = env, db = writer.database(), samples = samples.len(), "wrote samples");
        util::summary(
            global,
            &format!("Wrote {} samples to database {}", samples.len(), writer.database()),
        );
        return Ok(());
    }

    let out = if args.line_protocol {
        samples.iter().map(line_protocol).collect::<Vec<_>>().join("\n")
    } else {
        output::render_list(&global.output, &samples, |s| SampleRow::from(s), line_protocol)
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use indexmap::IndexMap;

    use super::*;

    fn args() -> MetricsArgs {
        MetricsArgs {
            clients: false,
            client_spools: false,
            vpns: false,
            spool: false,
            filter: "*".into(),
            line_protocol: true,
            influxdb_host: None,
            influxdb_port: 8086,
            influxdb_user: None,
            influxdb_pass: None,
            influxdb_db: "solace".into(),
            retention: "4w".into(),
            set_retention: false,
        }
    }

    #[test]
    fn influx_base_needs_a_host() {
        assert_eq!(influx_base(&args()).unwrap(), None);
        let with_host = MetricsArgs {
            influxdb_host: Some("grafana.local".into()),
            influxdb_port: 8087,
            ..args()
        };
        assert_eq!(
            influx_base(&with_host).unwrap().unwrap().as_str(),
            "http://grafana.local:8087/"
        );
    }

    #[test]
    fn influx_base_rejects_an_unusable_host() {
        let bad = MetricsArgs {
            influxdb_host: Some("grafana local".into()),
            ..args()
        };
        assert!(matches!(influx_base(&bad), Err(CliError::Validation { .. })));
    }

    #[test]
    fn sample_without_tags_keeps_the_field_separator() {
        let mut fields = IndexMap::new();
        fields.insert("messages".to_owned(), 7);
        let sample = MetricSample {
            measurement: "spool".into(),
            time: Utc.timestamp_opt(1, 0).unwrap(),
            tags: IndexMap::new(),
            fields,
        };
        assert_eq!(line_protocol(&sample), "spool messages=7i 1000000000");
    }

    #[test]
    fn no_flag_gathers_everything() {
        assert_eq!(kinds(&args()).len(), 4);
        let only_vpns = MetricsArgs { vpns: true, ..args() };
        assert_eq!(kinds(&only_vpns), vec![StatsKind::Vpns]);
    }

    #[test]
    fn sample_renders_as_line_protocol() {
        let mut tags = IndexMap::new();
        tags.insert("environment".to_owned(), "dev".to_owned());
        tags.insert("name".to_owned(), "app one".to_owned());
        let mut fields = IndexMap::new();
        fields.insert("total-client-messages-received".to_owned(), 42);
        fields.insert("spool_usage".to_owned(), 0);
        let sample = MetricSample {
            measurement: "vpn-stats".into(),
            time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            tags,
            fields,
        };
        assert_eq!(
            line_protocol(&sample),
            "vpn-stats,environment=dev,name=app\\ one total-client-messages-received=42i,spool_usage=0i 1700000000000000000"
        );
    }
}
