//! Managed service runner
//!
//! Wraps the AWS SDK query client. An explicit endpoint disables endpoint
//! discovery; otherwise discovery runs and its refresh task is spawned on
//! the current runtime.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_timestreamquery::error::DisplayErrorContext;
use aws_sdk_timestreamquery::{config, types, Client};
use tracing::{debug, info};

use super::{QueryRunner, RunnerError};
use crate::models::DatasourceSettings;
use crate::wire::{
    CancelOutput, ColumnInfo, Datum, QueryOutput, QueryStatus, Row, TimeSeriesDataPoint,
    WireType,
};

/// Runner backed by the managed time-series query service
pub struct TimestreamRunner {
    client: Client,
}

impl TimestreamRunner {
    /// Build a client from datasource settings
    pub async fn connect(settings: &DatasourceSettings) -> Result<Self, RunnerError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if !settings.region.is_empty() {
            loader = loader.region(Region::new(settings.region.clone()));
        }
        if !settings.profile.is_empty() {
            loader = loader.profile_name(&settings.profile);
        }
        let sdk_config = loader.load().await;

        let client = if settings.endpoint.is_empty() {
            let (client, reload) = Client::new(&sdk_config)
                .with_endpoint_discovery_enabled()
                .await
                .map_err(|e| RunnerError::Service(format!("endpoint discovery failed: {}", e)))?;
            tokio::spawn(reload.reload_task());
            client
        } else {
            let conf = config::Builder::from(&sdk_config)
                .endpoint_url(settings.endpoint.clone())
                .build();
            Client::from_conf(conf)
        };

        info!(
            region = %settings.region,
            endpoint = %settings.endpoint,
            "connected query client"
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl QueryRunner for TimestreamRunner {
    async fn query(
        &self,
        query: &str,
        next_token: Option<&str>,
    ) -> Result<QueryOutput, RunnerError> {
        debug!(token = ?next_token, "sending query");
        let output = self
            .client
            .query()
            .query_string(query)
            .set_next_token(next_token.map(String::from))
            .send()
            .await
            .map_err(|e| RunnerError::Service(DisplayErrorContext(&e).to_string()))?;

        Ok(QueryOutput {
            query_id: Some(output.query_id().to_string()),
            next_token: output.next_token().map(String::from),
            column_info: output.column_info().iter().map(column_info).collect(),
            rows: output.rows().iter().map(row).collect(),
            query_status: output.query_status().map(|s| QueryStatus {
                progress_percentage: Some(s.progress_percentage()),
                cumulative_bytes_scanned: Some(s.cumulative_bytes_scanned()),
                cumulative_bytes_metered: Some(s.cumulative_bytes_metered()),
            }),
        })
    }

    async fn cancel_query(&self, query_id: &str) -> Result<CancelOutput, RunnerError> {
        let output = self
            .client
            .cancel_query()
            .query_id(query_id)
            .send()
            .await
            .map_err(|e| RunnerError::Service(DisplayErrorContext(&e).to_string()))?;
        Ok(CancelOutput {
            cancellation_message: output.cancellation_message().map(String::from),
        })
    }
}

fn column_info(info: &types::ColumnInfo) -> ColumnInfo {
    ColumnInfo {
        name: info.name().map(String::from),
        column_type: info.r#type().map(wire_type),
    }
}

fn wire_type(t: &types::Type) -> WireType {
    WireType {
        scalar_type: t.scalar_type().map(|s| s.as_str().to_string()),
        array_column_info: t.array_column_info().map(|c| Box::new(column_info(c))),
        time_series_measure_value_column_info: t
            .time_series_measure_value_column_info()
            .map(|c| Box::new(column_info(c))),
        row_column_info: t
            .row_column_info
            .as_ref()
            .map(|cols| cols.iter().map(column_info).collect()),
    }
}

fn row(r: &types::Row) -> Row {
    Row::new(r.data().iter().map(datum).collect())
}

fn datum(d: &types::Datum) -> Datum {
    Datum {
        scalar_value: d.scalar_value().map(String::from),
        time_series_value: d.time_series_value.as_ref().map(|points| {
            points
                .iter()
                .map(|p| TimeSeriesDataPoint {
                    time: Some(p.time().to_string()),
                    value: p.value().map(datum),
                })
                .collect()
        }),
        array_value: d
            .array_value
            .as_ref()
            .map(|values| values.iter().map(datum).collect()),
        row_value: d.row_value().map(row),
        null_value: d.null_value(),
    }
}
