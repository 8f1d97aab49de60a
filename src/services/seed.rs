//! Demo data: sensors and flood zones around Jakarta.

use chrono::{DateTime, Duration, Timelike, Utc};
use rust_decimal::Decimal;

use crate::db::models::{FloodZoneFilter, NewFloodZone, NewReading, NewSensor, SensorFilter};
use crate::db::repository::{FloodZoneRepository, SensorRepository};
use crate::errors::AppError;
use crate::helpers::{coordinate_to_decimal, dec_to_f64, water_level_to_decimal};
use crate::services::classification::{classify, RiskLevel};
use crate::services::geometry::Coordinate;

/// Hours of reading history generated per sensor.
const HISTORY_HOURS: i64 = 24;

/// Lowest level the generated history goes down to, in cm.
const HISTORY_FLOOR_CM: f64 = 5.0;

struct DemoSensor {
    name: &'static str,
    code: &'static str,
    latitude: f64,
    longitude: f64,
    water_level: f64,
    address: &'static str,
    description: &'static str,
}

const SENSORS: &[DemoSensor] = &[
    DemoSensor {
        name: "Sensor Pintu Air Manggarai",
        code: "SNS-MGR001",
        latitude: -6.2095,
        longitude: 106.8503,
        water_level: 75.50,
        address: "Pintu Air Manggarai, Menteng, Jakarta Pusat",
        description: "Sensor utama pemantau ketinggian air di Pintu Air Manggarai, titik kritis aliran Kali Ciliwung.",
    },
    DemoSensor {
        name: "Sensor Kali Ciliwung Kampung Melayu",
        code: "SNS-KML002",
        latitude: -6.2256,
        longitude: 106.8646,
        water_level: 125.80,
        address: "Kampung Melayu, Jatinegara, Jakarta Timur",
        description: "Sensor pemantau di area Kampung Melayu yang sering terdampak banjir.",
    },
    DemoSensor {
        name: "Sensor Waduk Pluit",
        code: "SNS-PLT003",
        latitude: -6.1198,
        longitude: 106.7963,
        water_level: 35.20,
        address: "Waduk Pluit, Penjaringan, Jakarta Utara",
        description: "Sensor pemantau di Waduk Pluit, reservoir penting untuk pengendalian banjir Jakarta Utara.",
    },
    DemoSensor {
        name: "Sensor Kali Pesanggrahan",
        code: "SNS-PSG004",
        latitude: -6.2589,
        longitude: 106.7654,
        water_level: 28.40,
        address: "Kali Pesanggrahan, Kebayoran Lama, Jakarta Selatan",
        description: "Sensor pemantau di Kali Pesanggrahan area Jakarta Selatan.",
    },
    DemoSensor {
        name: "Sensor Kali Sunter",
        code: "SNS-SNT005",
        latitude: -6.1456,
        longitude: 106.8912,
        water_level: 68.90,
        address: "Kali Sunter, Tanjung Priok, Jakarta Utara",
        description: "Sensor pemantau di Kali Sunter, salah satu sungai utama Jakarta Utara.",
    },
    DemoSensor {
        name: "Sensor Waduk Ria Rio",
        code: "SNS-RIO006",
        latitude: -6.1876,
        longitude: 106.8789,
        water_level: 42.30,
        address: "Waduk Ria Rio, Pulogadung, Jakarta Timur",
        description: "Sensor pemantau di Waduk Ria Rio, area rekreasi dan pengendalian banjir.",
    },
    DemoSensor {
        name: "Sensor Kali Krukut",
        code: "SNS-KRK007",
        latitude: -6.2345,
        longitude: 106.8234,
        water_level: 85.60,
        address: "Kali Krukut, Tanah Abang, Jakarta Pusat",
        description: "Sensor pemantau di Kali Krukut yang melintasi pusat kota Jakarta.",
    },
    DemoSensor {
        name: "Sensor Kali Angke",
        code: "SNS-AGK008",
        latitude: -6.1567,
        longitude: 106.7432,
        water_level: 22.10,
        address: "Kali Angke, Cengkareng, Jakarta Barat",
        description: "Sensor pemantau di Kali Angke, area Jakarta Barat.",
    },
    DemoSensor {
        name: "Sensor Waduk Melati",
        code: "SNS-MLT009",
        latitude: -6.1723,
        longitude: 106.8567,
        water_level: 31.70,
        address: "Waduk Melati, Kemayoran, Jakarta Pusat",
        description: "Sensor pemantau di Waduk Melati, Jakarta Pusat.",
    },
    DemoSensor {
        name: "Sensor Kali Mookervart",
        code: "SNS-MKV010",
        latitude: -6.1834,
        longitude: 106.7123,
        water_level: 142.50,
        address: "Kali Mookervart, Kalideres, Jakarta Barat",
        description: "Sensor pemantau di Kali Mookervart, sering terdampak luapan air.",
    },
];

struct DemoZone {
    name: &'static str,
    description: &'static str,
    risk_level: RiskLevel,
    /// North edge, south edge, west edge, east edge.
    rect: (f64, f64, f64, f64),
}

const ZONES: &[DemoZone] = &[
    DemoZone {
        name: "Zona Banjir Kampung Melayu",
        description: "Area rawan banjir tingkat tinggi di sekitar Kampung Melayu. Sering terdampak luapan Kali Ciliwung terutama saat musim hujan. Warga diharapkan waspada dan siap evakuasi.",
        risk_level: RiskLevel::High,
        rect: (-6.2200, -6.2300, 106.8600, 106.8700),
    },
    DemoZone {
        name: "Zona Banjir Bidara Cina",
        description: "Area rawan banjir di Bidara Cina, terdampak langsung oleh luapan Kali Ciliwung. Ketinggian banjir bisa mencapai 1-2 meter saat puncak hujan.",
        risk_level: RiskLevel::High,
        rect: (-6.2280, -6.2350, 106.8560, 106.8640),
    },
    DemoZone {
        name: "Zona Banjir Manggarai",
        description: "Area sekitar Pintu Air Manggarai yang rawan terdampak banjir saat kapasitas pintu air terlampaui. Pemantauan intensif dilakukan di zona ini.",
        risk_level: RiskLevel::Medium,
        rect: (-6.2050, -6.2130, 106.8450, 106.8550),
    },
    DemoZone {
        name: "Zona Banjir Pluit",
        description: "Area rawan banjir di sekitar Waduk Pluit, Jakarta Utara. Rawan terdampak saat waduk meluap atau terjadi rob (banjir pasang air laut).",
        risk_level: RiskLevel::Medium,
        rect: (-6.1150, -6.1250, 106.7900, 106.8020),
    },
    DemoZone {
        name: "Zona Banjir Sunter",
        description: "Area rawan banjir di sekitar Kali Sunter, Jakarta Utara. Tingkat risiko rendah namun tetap perlu diwaspadai saat curah hujan tinggi.",
        risk_level: RiskLevel::Low,
        rect: (-6.1400, -6.1500, 106.8850, 106.8970),
    },
];

/// Closed rectangle, clockwise from the north-west corner.
fn rectangle((north, south, west, east): (f64, f64, f64, f64)) -> Vec<Coordinate> {
    vec![
        Coordinate(north, west),
        Coordinate(north, east),
        Coordinate(south, east),
        Coordinate(south, west),
        Coordinate(north, west),
    ]
}

/// Daily swing on top of a sensor's base level: high in the early morning
/// and at night, low in the early afternoon.
fn daily_variation(at: DateTime<Utc>, salt: u32) -> f64 {
    let time_factor = match at.hour() {
        5..=8 => 20.0,
        12..=15 => -12.0,
        20..=23 | 0..=4 => 12.0,
        _ => 0.0,
    };
    let noise = f64::from((at.hour() * 7 + salt * 13) % 21) - 10.0;
    time_factor + noise
}

fn demo_decimal(v: Option<Decimal>, raw: f64) -> Result<Decimal, AppError> {
    v.ok_or_else(|| AppError::InternalError(format!("Demo value {} is out of range", raw)))
}

/// Hourly readings for the last day, ending with the sensor's base level.
fn history(base: f64, salt: u32, now: DateTime<Utc>) -> Result<Vec<NewReading>, AppError> {
    let mut readings = (1..=HISTORY_HOURS)
        .rev()
        .map(|hours_ago| -> Result<NewReading, AppError> {
            let at = now - Duration::hours(hours_ago);
            let level = (base + daily_variation(at, salt)).max(HISTORY_FLOOR_CM);
            Ok(reading(demo_decimal(water_level_to_decimal(level), level)?, at))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let latest = now - Duration::minutes(i64::from(salt % 60) + 1);
    readings.push(reading(demo_decimal(water_level_to_decimal(base), base)?, latest));
    Ok(readings)
}

fn reading(water_level: Decimal, recorded_at: DateTime<Utc>) -> NewReading {
    NewReading {
        water_level,
        status: classify(dec_to_f64(water_level)),
        recorded_at,
    }
}

/// Seed sensors (with a day of readings) when no sensors exist yet.
/// Returns the number of sensors created.
pub async fn seed_sensors(
    repo: &dyn SensorRepository,
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    if !repo.find_filtered(&SensorFilter::default()).await?.is_empty() {
        return Ok(0);
    }

    for (i, demo) in SENSORS.iter().enumerate() {
        let water_level = demo_decimal(water_level_to_decimal(demo.water_level), demo.water_level)?;
        let sensor = repo
            .create(NewSensor {
                name: demo.name.to_string(),
                code: demo.code.to_string(),
                latitude: demo_decimal(coordinate_to_decimal(demo.latitude), demo.latitude)?,
                longitude: demo_decimal(coordinate_to_decimal(demo.longitude), demo.longitude)?,
                status: classify(dec_to_f64(water_level)),
                water_level,
                address: Some(demo.address.to_string()),
                description: Some(demo.description.to_string()),
                is_active: true,
                last_reading_at: None,
            })
            .await?;

        for r in history(demo.water_level, i as u32, now)? {
            repo.record_reading(sensor.id, r).await?;
        }
    }

    Ok(SENSORS.len())
}

/// Seed flood zones when no zones exist yet. Returns the number created.
pub async fn seed_zones(repo: &dyn FloodZoneRepository) -> Result<usize, AppError> {
    if !repo.find_filtered(&FloodZoneFilter::default()).await?.is_empty() {
        return Ok(0);
    }

    for demo in ZONES {
        repo.create(NewFloodZone {
            name: demo.name.to_string(),
            description: Some(demo.description.to_string()),
            coordinates: rectangle(demo.rect),
            risk_level: demo.risk_level,
            color: demo.risk_level.color().to_string(),
            is_active: true,
        })
        .await?;
    }

    Ok(ZONES.len())
}
