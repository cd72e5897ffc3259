//! Database Test Utilities
//!
//! Provides a MySQL test container with the hospital schema loaded, plus
//! helpers to seed bookings, source records and settings. Tests using it
//! need Docker and are marked `#[ignore]`.

use chrono::{NaiveDate, NaiveDateTime};
use infra_db::{create_pool, DatabaseConfig, DatabasePool};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tokio::sync::OnceCell;

const MYSQL_IMAGE: &str = "mysql";
const MYSQL_TAG: &str = "8.0";
const MYSQL_USER: &str = "root";
const MYSQL_PASSWORD: &str = "test_password";
const MYSQL_DB: &str = "mlite_test";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A wrapper around a MySQL test container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: DatabaseConfig,
    pub pool: DatabasePool,
}

impl TestDatabase {
    /// Starts a new MySQL container for testing
    ///
    /// # Returns
    ///
    /// A new TestDatabase instance with the schema created
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or the schema fails to load
    pub async fn new() -> Result<Self, BoxError> {
        let container = GenericImage::new(MYSQL_IMAGE, MYSQL_TAG)
            .with_exposed_port(3306.tcp())
            .with_wait_for(WaitFor::message_on_stderr("port: 3306  MySQL Community Server"))
            .with_env_var("MYSQL_ROOT_PASSWORD", MYSQL_PASSWORD)
            .with_env_var("MYSQL_DATABASE", MYSQL_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(3306).await?;
        let host = container.get_host().await?.to_string();

        let config = DatabaseConfig::new(host, port, MYSQL_USER, MYSQL_PASSWORD, MYSQL_DB)
            .max_connections(5)
            .connect_timeout(Duration::from_secs(30));

        let pool = connect_with_retry(&config).await?;

        let test_db = Self {
            _container: container,
            config,
            pool,
        };
        test_db.init_schema().await?;

        Ok(test_db)
    }

    /// Creates the tables from the schema file
    async fn init_schema(&self) -> Result<(), BoxError> {
        let schema = include_str!("../../../migrations/20240101_000001_his_schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Clears all data while preserving the schema
    pub async fn clear_data(&self) -> Result<(), BoxError> {
        let tables = [
            "mlite_antrian_referensi_taskid",
            "mlite_antrian_referensi",
            "mlite_antrian_loket",
            "mutasi_berkas",
            "pemeriksaan_ralan",
            "resep_obat",
            "reg_periksa",
            "pasien",
            "penjab",
            "poliklinik",
            "mlite_settings",
        ];

        for table in tables {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }
}

/// The server restarts once during initialization; retry until it accepts
async fn connect_with_retry(config: &DatabaseConfig) -> Result<DatabasePool, BoxError> {
    let mut last_error = None;
    for _ in 0..30 {
        match create_pool(config.clone()).await {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                last_error = Some(e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
    Err(match last_error {
        Some(e) => e.into(),
        None => "database never became ready".into(),
    })
}

/// Global test database for shared integration tests
static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Gets or creates a shared test database instance
///
/// # Panics
///
/// Panics if the database fails to initialize
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("Failed to create shared test database"),
            )
        })
        .await
        .clone()
}

/// Creates an isolated test database for a single test
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::new().await
}

/// One booking with its registration, ready to insert
#[derive(Debug, Clone)]
pub struct SeedBooking {
    pub reference: String,
    pub booking_code: String,
    pub medical_record: String,
    pub visit_number: String,
    pub date: NaiveDate,
    pub registered_at: NaiveDateTime,
    pub payer_code: String,
    pub sent: bool,
}

impl SeedBooking {
    /// A sent booking of payer `BPJ` registered at the given time
    pub fn sent(n: u32, registered_at: NaiveDateTime) -> Self {
        Self {
            reference: format!("0301R00103240{:06}", n),
            booking_code: format!("20240304A{:03}", n),
            medical_record: format!("{:06}", n),
            visit_number: format!("2024/03/04/{:06}", n),
            date: registered_at.date(),
            registered_at,
            payer_code: "BPJ".to_string(),
            sent: true,
        }
    }

    pub fn with_payer(mut self, payer_code: &str) -> Self {
        self.payer_code = payer_code.to_string();
        self
    }

    pub fn unsent(mut self) -> Self {
        self.sent = false;
        self
    }
}

/// Inserts a booking together with patient, clinic and registration rows
pub async fn seed_booking(pool: &DatabasePool, booking: &SeedBooking) -> Result<(), BoxError> {
    sqlx::query("INSERT IGNORE INTO pasien (no_rkm_medis, nm_pasien) VALUES (?, ?)")
        .bind(&booking.medical_record)
        .bind(format!("PATIENT {}", booking.medical_record))
        .execute(pool)
        .await?;

    sqlx::query("INSERT IGNORE INTO poliklinik (kd_poli, nm_poli) VALUES ('INT', 'Poli Penyakit Dalam')")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO reg_periksa (no_rawat, tgl_registrasi, jam_reg, no_rkm_medis, kd_poli, kd_pj)
        VALUES (?, ?, ?, ?, 'INT', ?)
        "#,
    )
    .bind(&booking.visit_number)
    .bind(booking.date)
    .bind(booking.registered_at.time())
    .bind(&booking.medical_record)
    .bind(&booking.payer_code)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO mlite_antrian_referensi
            (tanggal_periksa, no_rkm_medis, nomor_referensi, kodebooking, status_kirim)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(booking.date)
    .bind(&booking.medical_record)
    .bind(&booking.reference)
    .bind(&booking.booking_code)
    .bind(if booking.sent { "Sudah" } else { "Belum" })
    .execute(pool)
    .await?;

    Ok(())
}

/// Inserts counter queue times for a booking
pub async fn seed_counter(
    pool: &DatabasePool,
    booking: &SeedBooking,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<(), BoxError> {
    sqlx::query(
        "INSERT INTO mlite_antrian_loket (type, no_rkm_medis, postdate, start_time, end_time) VALUES ('Loket', ?, ?, ?, ?)",
    )
    .bind(&booking.medical_record)
    .bind(booking.date)
    .bind(start.time())
    .bind(end.time())
    .execute(pool)
    .await?;
    Ok(())
}

/// Inserts medical file movement times for a booking
pub async fn seed_file_movement(
    pool: &DatabasePool,
    booking: &SeedBooking,
    dispatched: NaiveDateTime,
    received: NaiveDateTime,
) -> Result<(), BoxError> {
    sqlx::query("INSERT INTO mutasi_berkas (no_rawat, status, dikirim, diterima) VALUES (?, 'Sudah Diterima', ?, ?)")
        .bind(&booking.visit_number)
        .bind(dispatched)
        .bind(received)
        .execute(pool)
        .await?;
    Ok(())
}

/// Inserts the queue service settings
pub async fn seed_settings(pool: &DatabasePool, base_url: &str, payer_code: Option<&str>) -> Result<(), BoxError> {
    let mut values = vec![
        ("BpjsConsID", "12345"),
        ("BpjsSecretKey", "secret-key"),
        ("BpjsAntrianUrl", base_url),
        ("BpjsUserKey", "user-key"),
    ];
    if let Some(code) = payer_code {
        values.push(("kd_pj_bpjs", code));
    }

    for (field, value) in values {
        sqlx::query("INSERT INTO mlite_settings (module, field, value) VALUES ('jkn_mobile', ?, ?)")
            .bind(field)
            .bind(value)
            .execute(pool)
            .await?;
    }
    Ok(())
}
