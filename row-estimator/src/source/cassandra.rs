//! Sample rows from a Cassandra or ScyllaDB cluster

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::StreamExt;
use openssl::ssl::{SslContextBuilder, SslMethod, SslVerifyMode};
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::policies::load_balancing::DefaultPolicy;
use scylla::statement::prepared::PreparedStatement;
use scylla::statement::Consistency;
use scylla::value::{CqlDuration, CqlValue, Row};
use tracing::{event, instrument, Level};

use super::{ColumnMetadata, DataSource, RowStream, SampledRow, TokenRange};
use crate::conf::{RunConfig, SampleMode};
use crate::value::Value;
use crate::Error;

/// Quote a CQL identifier so case sensitive names survive
///
/// # Arguments
///
/// * `ident` - The identifier to quote
fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote and join a list of identifiers
///
/// # Arguments
///
/// * `idents` - The identifiers to join
fn quote_list(idents: &[String]) -> String {
    idents
        .iter()
        .map(|ident| quote(ident))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the CQL to sample a single token range
///
/// # Arguments
///
/// * `keyspace` - The keyspace the table is in
/// * `table` - The table to sample
/// * `columns` - The schema of the table
/// * `mode` - What we are measuring in each row
/// * `limit` - The most rows to return
fn range_cql(
    keyspace: &str,
    table: &str,
    columns: &ColumnMetadata,
    mode: SampleMode,
    limit: u32,
) -> String {
    // build the columns to select
    let select = match mode {
        SampleMode::Raw => "*".to_owned(),
        SampleMode::Json => format!("JSON {}", quote_list(&columns.columns)),
    };
    let partition_key = quote_list(&columns.partition_key);
    format!(
        "SELECT {select} FROM {}.{} \
        WHERE token({partition_key}) > ? AND token({partition_key}) < ? \
        LIMIT {limit}",
        quote(keyspace),
        quote(table),
    )
}

/// Render a signed big endian varint as decimal digits
///
/// # Arguments
///
/// * `bytes` - The two's complement big endian bytes
fn varint_text(bytes: &[u8]) -> String {
    let negative = bytes.first().is_some_and(|byte| byte & 0x80 != 0);
    let mut magnitude = bytes.to_vec();
    if negative {
        // negate our two's complement bytes to get the magnitude
        magnitude.iter_mut().for_each(|byte| *byte = !*byte);
        for byte in magnitude.iter_mut().rev() {
            let (sum, carry) = byte.overflowing_add(1);
            *byte = sum;
            if !carry {
                break;
            }
        }
    }
    // peel off the lowest digit until nothing is left
    let mut digits = Vec::new();
    while magnitude.iter().any(|byte| *byte != 0) {
        let mut remainder = 0_u16;
        for byte in &mut magnitude {
            let acc = (remainder << 8) | u16::from(*byte);
            *byte = (acc / 10) as u8;
            remainder = acc % 10;
        }
        digits.push(char::from(b'0' + remainder as u8));
    }
    if digits.is_empty() {
        digits.push('0');
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Render a decimal as plain text
///
/// # Arguments
///
/// * `bytes` - The unscaled value as two's complement big endian bytes
/// * `scale` - How many digits sit after the decimal point
fn decimal_text(bytes: &[u8], scale: i32) -> String {
    let unscaled = varint_text(bytes);
    let (sign, digits) = match unscaled.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", unscaled.as_str()),
    };
    if digits == "0" {
        return "0".to_owned();
    }
    // a negative scale shifts our digits left
    if scale <= 0 {
        let zeros = "0".repeat(scale.unsigned_abs() as usize);
        return format!("{sign}{digits}{zeros}");
    }
    let scale = scale as usize;
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (whole, fraction) = padded.split_at(padded.len() - scale);
    format!("{sign}{whole}.{fraction}")
}

/// Render a duration in its compact unit form like `1y2mo3d4h`
///
/// # Arguments
///
/// * `duration` - The duration to render
fn duration_text(duration: CqlDuration) -> String {
    let negative = duration.months < 0 || duration.days < 0 || duration.nanoseconds < 0;
    let months = u64::from(duration.months.unsigned_abs());
    let days = u64::from(duration.days.unsigned_abs());
    let nanos = duration.nanoseconds.unsigned_abs();
    let units = [
        (months / 12, "y"),
        (months % 12, "mo"),
        (days, "d"),
        (nanos / 3_600_000_000_000, "h"),
        (nanos / 60_000_000_000 % 60, "m"),
        (nanos / 1_000_000_000 % 60, "s"),
        (nanos / 1_000_000 % 1000, "ms"),
        (nanos / 1000 % 1000, "us"),
        (nanos % 1000, "ns"),
    ];
    let text = units
        .iter()
        .filter(|(amount, _)| *amount > 0)
        .map(|(amount, unit)| format!("{amount}{unit}"))
        .collect::<String>();
    match (text.is_empty(), negative) {
        (true, _) => "0s".to_owned(),
        (false, true) => format!("-{text}"),
        (false, false) => text,
    }
}

/// Cast a value from the driver into a value we can size
///
/// Scalars keep the text they print as. Timestamps, dates, and times that
/// fall outside what chrono can represent keep their raw counts.
///
/// # Arguments
///
/// * `value` - The driver value to cast
fn to_value(value: CqlValue) -> Value {
    match value {
        CqlValue::Ascii(text) | CqlValue::Text(text) => Value::Scalar(text),
        CqlValue::Boolean(flag) => Value::scalar(flag),
        CqlValue::Blob(bytes) => {
            Value::Scalar(format!("0x{}", data_encoding::HEXLOWER.encode(&bytes)))
        }
        CqlValue::Double(num) => Value::scalar(num),
        CqlValue::Float(num) => Value::scalar(num),
        CqlValue::BigInt(num) => Value::scalar(num),
        CqlValue::Int(num) => Value::scalar(num),
        CqlValue::SmallInt(num) => Value::scalar(num),
        CqlValue::TinyInt(num) => Value::scalar(num),
        CqlValue::Counter(counter) => Value::scalar(counter.0),
        CqlValue::Varint(varint) => Value::Scalar(varint_text(varint.as_signed_bytes_be_slice())),
        CqlValue::Decimal(decimal) => {
            let (bytes, scale) = decimal.as_signed_be_bytes_slice_and_exponent();
            Value::Scalar(decimal_text(bytes, scale))
        }
        CqlValue::Timestamp(timestamp) => {
            let datetime: Result<DateTime<Utc>, _> = timestamp.try_into();
            match datetime {
                Ok(datetime) => Value::scalar(datetime.naive_utc()),
                Err(_) => Value::scalar(timestamp.0),
            }
        }
        CqlValue::Date(date) => {
            let naive: Result<NaiveDate, _> = date.try_into();
            match naive {
                Ok(naive) => Value::scalar(naive),
                Err(_) => Value::scalar(date.0),
            }
        }
        CqlValue::Time(time) => {
            let naive: Result<NaiveTime, _> = time.try_into();
            match naive {
                Ok(naive) => Value::scalar(naive),
                Err(_) => Value::scalar(time.0),
            }
        }
        CqlValue::Duration(duration) => Value::Scalar(duration_text(duration)),
        CqlValue::Inet(addr) => Value::scalar(addr),
        CqlValue::Uuid(uuid) => Value::scalar(uuid),
        CqlValue::Timeuuid(timeuuid) => Value::scalar(timeuuid),
        CqlValue::Empty => Value::Null,
        CqlValue::List(items) | CqlValue::Vector(items) => {
            Value::List(items.into_iter().map(to_value).collect())
        }
        CqlValue::Set(items) => Value::Set(items.into_iter().map(to_value).collect()),
        CqlValue::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (to_value(key), to_value(value)))
                .collect(),
        ),
        CqlValue::Tuple(items) => {
            Value::Tuple(items.into_iter().map(|item| item.map(to_value).into()).collect())
        }
        CqlValue::UserDefinedType { fields, .. } => Value::Map(
            fields
                .into_iter()
                .map(|(name, value)| (Value::Scalar(name), value.map(to_value).into()))
                .collect(),
        ),
        // types added to the driver later use their CQL literal form
        other => Value::scalar(other),
    }
}

/// Build a TLS context that verifies the cluster with a CA certificate
///
/// # Arguments
///
/// * `conf` - The config for this run
fn tls_context(conf: &RunConfig) -> Result<Option<openssl::ssl::SslContext>, Error> {
    // skip TLS if its not enabled
    if !conf.ssl {
        return Ok(None);
    }
    let cert = conf
        .path_cert
        .as_ref()
        .ok_or_else(|| Error::invalid_config("ssl requires path-cert to be set"))?;
    let mut builder = SslContextBuilder::new(SslMethod::tls())?;
    builder.set_ca_file(cert)?;
    builder.set_verify(SslVerifyMode::PEER);
    Ok(Some(builder.build()))
}

/// A prepared range query and what it measures
pub struct RangeStatement {
    /// The prepared statement to execute per range
    prepared: PreparedStatement,
    /// What this statement returns for each row
    mode: SampleMode,
}

/// A source of rows backed by a Cassandra or ScyllaDB cluster
pub struct ScyllaSource {
    /// The scylla client to talk to the cluster with
    session: Session,
    /// The keyspace the table is in
    keyspace: String,
    /// The table to sample
    table: String,
    /// The most rows to pull from a single range
    rows_per_request: u32,
    /// The number of rows to fetch per page
    pagination: i32,
}

impl ScyllaSource {
    /// Connect to the cluster for this run
    ///
    /// # Arguments
    ///
    /// * `conf` - The config for this run
    #[instrument(name = "ScyllaSource::connect", skip_all, fields(endpoint = %conf.endpoint()), err(Debug))]
    pub async fn connect(conf: &RunConfig) -> Result<Self, Error> {
        // route our queries to our preferred datacenter
        let policy = DefaultPolicy::builder()
            .prefer_datacenter(conf.dc.clone())
            .token_aware(true)
            .permit_dc_failover(false)
            .build();
        let profile = ExecutionProfile::builder()
            .load_balancing_policy(policy)
            .consistency(Consistency::LocalOne)
            .build();
        // start building our scylla client
        let mut session = SessionBuilder::new()
            .known_node(conf.endpoint())
            .default_execution_profile_handle(profile.into_handle());
        // if we have auth info then add that
        if let Some((username, password)) = conf.credentials() {
            // inject our creds
            session = session.user(username, password);
        } else if conf.username.is_some() || conf.password.is_some() {
            event!(
                Level::WARN,
                "Both a username and password are required to authenticate; connecting without auth"
            );
        }
        // add our tls context if we have one
        if let Some(context) = tls_context(conf)? {
            session = session.tls_context(Some(context));
        }
        // set our request timeout
        let session = session.connection_timeout(conf.setup_time()).build().await?;
        event!(Level::INFO, "Connected to {}", conf.endpoint());
        Ok(ScyllaSource {
            session,
            keyspace: conf.keyspace.clone(),
            table: conf.table.clone(),
            rows_per_request: conf.rows_per_request,
            pagination: conf.pagination,
        })
    }

    /// Prepare a query with a relaxed consistency
    ///
    /// # Arguments
    ///
    /// * `cql` - The query to prepare
    async fn prepare_local_one(&self, cql: String) -> Result<PreparedStatement, Error> {
        let mut prepared = self.session.prepare(cql).await?;
        prepared.set_consistency(Consistency::LocalOne);
        Ok(prepared)
    }

    /// Get the name of every column in our table
    #[instrument(name = "ScyllaSource::column_names", skip(self), err(Debug))]
    async fn column_names(&self) -> Result<Vec<String>, Error> {
        let prepared = self
            .prepare_local_one(
                "SELECT column_name FROM system_schema.columns \
                WHERE keyspace_name = ? AND table_name = ?"
                    .to_owned(),
            )
            .await?;
        let mut typed_stream = self
            .session
            .execute_iter(prepared, (&self.keyspace, &self.table))
            .await?
            .rows_stream::<(String,)>()?;
        let mut columns = Vec::new();
        while let Some(row) = typed_stream.next().await {
            let (column,) = row?;
            columns.push(column);
        }
        Ok(columns)
    }

    /// Get the partition key columns for our table ordered by position
    #[instrument(name = "ScyllaSource::partition_key", skip(self), err(Debug))]
    async fn partition_key(&self) -> Result<Vec<String>, Error> {
        let prepared = self
            .prepare_local_one(
                "SELECT column_name, position FROM system_schema.columns \
                WHERE keyspace_name = ? AND table_name = ? AND kind = 'partition_key' \
                ALLOW FILTERING"
                    .to_owned(),
            )
            .await?;
        let mut typed_stream = self
            .session
            .execute_iter(prepared, (&self.keyspace, &self.table))
            .await?
            .rows_stream::<(String, i32)>()?;
        let mut keys = Vec::new();
        while let Some(row) = typed_stream.next().await {
            keys.push(row?);
        }
        // order our keys by their declared position
        keys.sort_by_key(|(_, position)| *position);
        Ok(keys.into_iter().map(|(column, _)| column).collect())
    }
}

#[async_trait::async_trait]
impl DataSource for ScyllaSource {
    type Query = RangeStatement;

    /// Get every token in the ring in order
    async fn token_ring(&self) -> Result<Vec<i64>, Error> {
        let state = self.session.get_cluster_state();
        let ring = state
            .replica_locator()
            .ring()
            .iter()
            .map(|(token, _)| token.value())
            .collect();
        Ok(ring)
    }

    /// Get the column names and partition key for our table
    async fn columns(&self) -> Result<ColumnMetadata, Error> {
        let columns = self.column_names().await?;
        // a table without columns was never found in the schema
        if columns.is_empty() {
            return Err(Error::new(format!(
                "Table {}.{} was not found",
                self.keyspace, self.table
            )));
        }
        let partition_key = self.partition_key().await?;
        Ok(ColumnMetadata {
            columns,
            partition_key,
        })
    }

    /// Prepare the statement used for every token range
    async fn prepare(
        &self,
        columns: &ColumnMetadata,
        mode: SampleMode,
    ) -> Result<RangeStatement, Error> {
        if columns.partition_key.is_empty() {
            return Err(Error::new(format!(
                "Table {}.{} has no partition key",
                self.keyspace, self.table
            )));
        }
        let cql = range_cql(
            &self.keyspace,
            &self.table,
            columns,
            mode,
            self.rows_per_request,
        );
        event!(Level::DEBUG, cql = %cql, "Prepared range query");
        let mut prepared = self.prepare_local_one(cql).await?;
        prepared.set_page_size(self.pagination);
        Ok(RangeStatement { prepared, mode })
    }

    /// Start streaming the rows in a single token range
    async fn sample_range<'a>(
        &'a self,
        query: &'a RangeStatement,
        range: TokenRange,
    ) -> Result<RowStream<'a>, Error> {
        // build and execute our paged query
        let pager = self
            .session
            .execute_iter(query.prepared.clone(), (range.start, range.end))
            .await?;
        // build a typed stream for these rows
        let stream = match query.mode {
            SampleMode::Raw => pager
                .rows_stream::<Row>()?
                .map(|row| -> Result<SampledRow, Error> {
                    let values = row?
                        .columns
                        .into_iter()
                        .map(|column| column.map(to_value).into())
                        .collect();
                    Ok(SampledRow::Raw(values))
                })
                .boxed(),
            SampleMode::Json => pager
                .rows_stream::<(String,)>()?
                .map(|row| -> Result<SampledRow, Error> { Ok(SampledRow::Json(row?.0)) })
                .boxed(),
        };
        Ok(stream)
    }
}
