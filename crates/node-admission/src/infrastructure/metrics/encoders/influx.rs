use std::collections::HashMap;

use influxdb_line_protocol::LineProtocolBuilder;

use super::FieldValue;
use super::MetricsEncoder;

/// InfluxDB line protocol encoder
pub struct InfluxEncoder;

impl MetricsEncoder for InfluxEncoder {
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &HashMap<String, String>,
        fields: &HashMap<String, FieldValue>,
        timestamp: i64,
    ) -> String {
        let mut builder = LineProtocolBuilder::new().measurement(measurement);

        // Sorted tags and fields keep lines stable between snapshots
        let mut tag_entries: Vec<_> = tags.iter().collect();
        tag_entries.sort_by_key(|(k, _)| *k);
        for (key, value) in tag_entries {
            builder = builder.tag(key, value);
        }

        let mut field_entries: Vec<_> = fields.iter().collect();
        field_entries.sort_by_key(|(k, _)| *k);

        let Some(((first_key, first_value), rest)) = field_entries.split_first() else {
            let lp_built = builder
                .field("_empty", true)
                .timestamp(timestamp)
                .close_line()
                .build();
            return String::from_utf8_lossy(&lp_built).into_owned();
        };

        let mut after_first_field = match first_value {
            FieldValue::UnsignedInteger(u) => builder.field(first_key, *u),
            FieldValue::Float(f) => builder.field(first_key, *f),
        };
        for (key, value) in rest {
            after_first_field = match value {
                FieldValue::UnsignedInteger(u) => after_first_field.field(key, *u),
                FieldValue::Float(f) => after_first_field.field(key, *f),
            };
        }

        let lp_built = after_first_field.timestamp(timestamp).close_line().build();
        String::from_utf8_lossy(&lp_built).into_owned()
    }
}
