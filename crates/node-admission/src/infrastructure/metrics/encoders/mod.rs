use std::collections::HashMap;

pub mod influx;
pub mod json;

/// Parameters for encoding one resource class of the pool
#[derive(Debug, Clone)]
pub struct PoolMetricsParams<'a> {
    pub node_name: &'a str,
    pub class: &'a str,
    pub total: u64,
    pub available: u64,
    pub timestamp: i64,
}

/// Parameters for encoding admission counters
#[derive(Debug, Clone)]
pub struct AdmissionMetricsParams<'a> {
    pub node_name: &'a str,
    pub admitted: u64,
    pub rejected: u64,
    pub released: u64,
    pub timestamp: i64,
}

/// Field value for metrics
#[derive(Debug, Clone)]
pub enum FieldValue {
    UnsignedInteger(u64),
    Float(f64),
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::UnsignedInteger(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// Trait for encoding metrics in different formats
pub trait MetricsEncoder: Send + Sync {
    /// Encode metrics with measurement name, tags, fields, and timestamp
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &HashMap<String, String>,
        fields: &HashMap<String, FieldValue>,
        timestamp: i64,
    ) -> String;

    fn encode_pool_metrics(&self, params: &PoolMetricsParams) -> String {
        let mut tags = HashMap::new();
        tags.insert("node".to_string(), params.node_name.to_string());
        tags.insert("class".to_string(), params.class.to_string());

        let reserved = params.total.saturating_sub(params.available);
        let utilization = if params.total == 0 {
            0.0
        } else {
            reserved as f64 / params.total as f64
        };

        let mut fields = HashMap::new();
        fields.insert("total".to_string(), params.total.into());
        fields.insert("available".to_string(), params.available.into());
        fields.insert("reserved".to_string(), reserved.into());
        fields.insert("utilization".to_string(), utilization.into());

        self.encode_metrics("resource_pool", &tags, &fields, params.timestamp)
    }

    fn encode_admission_metrics(&self, params: &AdmissionMetricsParams) -> String {
        let mut tags = HashMap::new();
        tags.insert("node".to_string(), params.node_name.to_string());

        let mut fields = HashMap::new();
        fields.insert("admitted".to_string(), params.admitted.into());
        fields.insert("rejected".to_string(), params.rejected.into());
        fields.insert("released".to_string(), params.released.into());

        self.encode_metrics("admission", &tags, &fields, params.timestamp)
    }
}

/// Concrete encoder without dynamic dispatch
pub enum Encoder {
    Json(json::JsonEncoder),
    Influx(influx::InfluxEncoder),
}

impl MetricsEncoder for Encoder {
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &HashMap<String, String>,
        fields: &HashMap<String, FieldValue>,
        timestamp: i64,
    ) -> String {
        match self {
            Encoder::Json(inner) => inner.encode_metrics(measurement, tags, fields, timestamp),
            Encoder::Influx(inner) => inner.encode_metrics(measurement, tags, fields, timestamp),
        }
    }
}

/// Pick an encoder by format name; anything unknown falls back to influx
pub fn create_encoder(format: &str) -> Encoder {
    match format.to_lowercase().as_str() {
        "json" => Encoder::Json(json::JsonEncoder),
        _ => Encoder::Influx(influx::InfluxEncoder),
    }
}
