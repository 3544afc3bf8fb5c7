use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, Row, params};
use tracing::debug;

use crate::catalog::{
    Catalog, Cruise, Investigator, Lookup, NewSample, Sample, SampleAttr, SampleAttrType,
    SampleFile, SampleFileType, SampleKey,
};
use crate::error::LoaderError;

pub const CATALOG_SCHEMA_VERSION: i64 = 1;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const SAMPLE_COLUMNS: &str = "
    s.sample_id, s.cruise_id, c.cruise_name, s.station_number, s.cast_number, s.sample_name,
    s.collection_start, s.collection_time_zone, s.depth, s.latitude_start, s.longitude_start
";

/// Catalog backed by a SQLite database.
pub struct SqliteCatalog {
    conn: Connection,
    depth: usize,
}

impl SqliteCatalog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let conn = Connection::open(path)?;
        let catalog = Self { conn, depth: 0 };
        catalog.migrate()?;
        Ok(catalog)
    }

    pub fn open_in_memory() -> Result<Self, LoaderError> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self { conn, depth: 0 };
        catalog.migrate()?;
        Ok(catalog)
    }

    fn open_depth(&self) -> Result<usize, LoaderError> {
        self.depth
            .checked_sub(1)
            .ok_or_else(|| LoaderError::Database("no open unit of work".to_string()))
    }

    pub fn schema_version(&self) -> Result<i64, LoaderError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), LoaderError> {
        let current = self.schema_version()?;
        if current > CATALOG_SCHEMA_VERSION {
            return Err(LoaderError::Database(format!(
                "catalog schema version {current} is newer than supported version {CATALOG_SCHEMA_VERSION}"
            )));
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_catalog_schema.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 1", [])
                .map(|_| ())?;
        }

        Ok(())
    }

    pub fn seed_investigator(&self, last_name: &str) -> Result<Investigator, LoaderError> {
        self.conn.execute(
            "INSERT INTO investigator (last_name) VALUES (?1)",
            params![last_name],
        )?;
        Ok(Investigator {
            id: self.conn.last_insert_rowid(),
            last_name: last_name.to_string(),
        })
    }

    pub fn seed_attribute_type(&self, type_name: &str) -> Result<SampleAttrType, LoaderError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO sample_attr_type (type) VALUES (?1)",
            params![type_name],
        )?;
        let id = self.conn.query_row(
            "SELECT sample_attr_type_id FROM sample_attr_type WHERE type = ?1",
            params![type_name],
            |row| row.get(0),
        )?;
        Ok(SampleAttrType {
            id,
            type_name: type_name.to_string(),
        })
    }

    pub fn seed_file_type(&self, type_name: &str) -> Result<SampleFileType, LoaderError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO sample_file_type (type) VALUES (?1)",
            params![type_name],
        )?;
        let id = self.conn.query_row(
            "SELECT sample_file_type_id FROM sample_file_type WHERE type = ?1",
            params![type_name],
            |row| row.get(0),
        )?;
        Ok(SampleFileType {
            id,
            type_name: type_name.to_string(),
        })
    }

    pub fn count_samples(&self) -> Result<usize, LoaderError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sample", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_samples(
        &self,
        filter: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<Sample>, LoaderError> {
        let sql = format!(
            "SELECT {SAMPLE_COLUMNS} FROM sample s JOIN cruise c ON c.cruise_id = s.cruise_id \
             WHERE {filter} ORDER BY s.sample_id"
        );
        let mut statement = self.conn.prepare(&sql)?;
        let rows = statement.query_map(args, sample_from_row)?;
        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }
        Ok(samples)
    }
}

fn sample_from_row(row: &Row<'_>) -> rusqlite::Result<Sample> {
    let collection_start = row
        .get::<_, Option<String>>(6)?
        .map(|value| {
            NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    Box::new(err),
                )
            })
        })
        .transpose()?;

    Ok(Sample {
        id: row.get(0)?,
        cruise_id: row.get(1)?,
        cruise_name: row.get(2)?,
        station_number: row.get(3)?,
        cast_number: row.get(4)?,
        sample_name: row.get(5)?,
        collection_start,
        collection_time_zone: row.get(7)?,
        depth: row.get(8)?,
        latitude_start: row.get(9)?,
        longitude_start: row.get(10)?,
    })
}

fn cruise_from_row(row: &Row<'_>) -> rusqlite::Result<Cruise> {
    let parse_date = |index: usize| -> rusqlite::Result<Option<NaiveDate>> {
        row.get::<_, Option<String>>(index)?
            .map(|value| {
                NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|err| {
                    rusqlite::Error::FromSqlConversionFailure(
                        index,
                        rusqlite::types::Type::Text,
                        Box::new(err),
                    )
                })
            })
            .transpose()
    };

    Ok(Cruise {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: parse_date(2)?,
        end_date: parse_date(3)?,
    })
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>, LoaderError> {
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

impl Catalog for SqliteCatalog {
    // Units nest as savepoints; releasing the outermost one commits.
    fn begin(&mut self) -> Result<(), LoaderError> {
        self.conn
            .execute_batch(&format!("SAVEPOINT unit_{}", self.depth))?;
        self.depth += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), LoaderError> {
        let depth = self.open_depth()?;
        self.conn.execute_batch(&format!("RELEASE unit_{depth}"))?;
        self.depth = depth;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), LoaderError> {
        let depth = self.open_depth()?;
        self.conn.execute_batch(&format!(
            "ROLLBACK TO unit_{depth}; RELEASE unit_{depth}"
        ))?;
        self.depth = depth;
        Ok(())
    }

    fn find_investigator(&self, last_name: &str) -> Result<Lookup<Investigator>, LoaderError> {
        let mut statement = self.conn.prepare(
            "SELECT investigator_id, last_name FROM investigator WHERE last_name = ?1",
        )?;
        let rows = statement.query_map(params![last_name], |row| {
            Ok(Investigator {
                id: row.get(0)?,
                last_name: row.get(1)?,
            })
        })?;
        Ok(Lookup::from_rows(collect(rows)?))
    }

    fn find_cruise(&self, name: &str) -> Result<Lookup<Cruise>, LoaderError> {
        let mut statement = self.conn.prepare(
            "SELECT cruise_id, cruise_name, start_date, end_date FROM cruise WHERE cruise_name = ?1",
        )?;
        let rows = statement.query_map(params![name], cruise_from_row)?;
        Ok(Lookup::from_rows(collect(rows)?))
    }

    fn insert_cruise(&mut self, name: &str) -> Result<Cruise, LoaderError> {
        self.conn
            .execute("INSERT INTO cruise (cruise_name) VALUES (?1)", params![name])?;
        debug!(cruise = name, "inserted cruise");
        Ok(Cruise {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            start_date: None,
            end_date: None,
        })
    }

    fn find_sample(&self, key: &SampleKey) -> Result<Lookup<Sample>, LoaderError> {
        let samples = self.query_samples(
            "s.cruise_id = ?1 AND s.station_number = ?2 AND s.cast_number = ?3 AND s.sample_name = ?4",
            params![
                key.cruise_id,
                key.station_number,
                key.cast_number,
                key.sample_name
            ],
        )?;
        Ok(Lookup::from_rows(samples))
    }

    fn find_samples_by_name(&self, sample_name: &str) -> Result<Vec<Sample>, LoaderError> {
        self.query_samples("s.sample_name = ?1", params![sample_name])
    }

    fn samples_at_station(
        &self,
        cruise_name: &str,
        station_number: i64,
    ) -> Result<Vec<Sample>, LoaderError> {
        self.query_samples(
            "c.cruise_name = ?1 AND s.station_number = ?2",
            params![cruise_name, station_number],
        )
    }

    fn samples_for_investigator(&self, investigator_id: i64) -> Result<Vec<Sample>, LoaderError> {
        self.query_samples(
            "s.sample_id IN (SELECT sample_id FROM sample_to_investigator WHERE investigator_id = ?1)",
            params![investigator_id],
        )
    }

    fn insert_sample(&mut self, sample: &NewSample) -> Result<Sample, LoaderError> {
        let collection_start = sample
            .collection_start
            .map(|value| value.format(TIMESTAMP_FORMAT).to_string());
        self.conn.execute(
            "INSERT INTO sample (cruise_id, station_number, cast_number, sample_name, \
             collection_start, collection_time_zone, depth, latitude_start, longitude_start) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                sample.key.cruise_id,
                sample.key.station_number,
                sample.key.cast_number,
                sample.key.sample_name,
                collection_start,
                sample.collection_time_zone,
                sample.depth,
                sample.latitude_start,
                sample.longitude_start,
            ],
        )?;
        let sample_id = self.conn.last_insert_rowid();
        self.conn.execute(
            "INSERT INTO sample_to_investigator (sample_id, investigator_id) VALUES (?1, ?2)",
            params![sample_id, sample.investigator_id],
        )?;

        self.query_samples("s.sample_id = ?1", params![sample_id])?
            .pop()
            .ok_or_else(|| {
                LoaderError::Database(format!("sample {sample_id} vanished after insert"))
            })
    }

    fn update_sample_position(
        &mut self,
        sample_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), LoaderError> {
        self.conn.execute(
            "UPDATE sample SET latitude_start = ?1, longitude_start = ?2 WHERE sample_id = ?3",
            params![latitude, longitude, sample_id],
        )?;
        Ok(())
    }

    fn delete_sample(&mut self, sample_id: i64) -> Result<(), LoaderError> {
        self.conn
            .execute("DELETE FROM sample_attr WHERE sample_id = ?1", params![sample_id])?;
        self.conn
            .execute("DELETE FROM sample_file WHERE sample_id = ?1", params![sample_id])?;
        self.conn.execute(
            "DELETE FROM sample_to_investigator WHERE sample_id = ?1",
            params![sample_id],
        )?;
        self.conn
            .execute("DELETE FROM sample WHERE sample_id = ?1", params![sample_id])?;
        Ok(())
    }

    fn attribute_types(&self) -> Result<Vec<SampleAttrType>, LoaderError> {
        let mut statement = self
            .conn
            .prepare("SELECT sample_attr_type_id, type FROM sample_attr_type ORDER BY type")?;
        let rows = statement.query_map([], |row| {
            Ok(SampleAttrType {
                id: row.get(0)?,
                type_name: row.get(1)?,
            })
        })?;
        collect(rows)
    }

    fn find_attributes(
        &self,
        sample_id: i64,
        attr_type_id: i64,
    ) -> Result<Vec<SampleAttr>, LoaderError> {
        let mut statement = self.conn.prepare(
            "SELECT sample_attr_id, sample_id, sample_attr_type_id, value FROM sample_attr \
             WHERE sample_id = ?1 AND sample_attr_type_id = ?2 ORDER BY sample_attr_id",
        )?;
        let rows = statement.query_map(params![sample_id, attr_type_id], |row| {
            Ok(SampleAttr {
                id: row.get(0)?,
                sample_id: row.get(1)?,
                attr_type_id: row.get(2)?,
                value: row.get(3)?,
            })
        })?;
        collect(rows)
    }

    fn count_attributes(&self, sample_id: i64) -> Result<usize, LoaderError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sample_attr WHERE sample_id = ?1",
            params![sample_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn insert_attribute(
        &mut self,
        sample_id: i64,
        attr_type_id: i64,
        value: &str,
    ) -> Result<SampleAttr, LoaderError> {
        self.conn.execute(
            "INSERT INTO sample_attr (sample_id, sample_attr_type_id, value) VALUES (?1, ?2, ?3)",
            params![sample_id, attr_type_id, value],
        )?;
        Ok(SampleAttr {
            id: self.conn.last_insert_rowid(),
            sample_id,
            attr_type_id,
            value: value.to_string(),
        })
    }

    fn update_attribute(&mut self, attr_id: i64, value: &str) -> Result<(), LoaderError> {
        self.conn.execute(
            "UPDATE sample_attr SET value = ?1 WHERE sample_attr_id = ?2",
            params![value, attr_id],
        )?;
        Ok(())
    }

    fn find_file_type(&self, type_name: &str) -> Result<Lookup<SampleFileType>, LoaderError> {
        let mut statement = self.conn.prepare(
            "SELECT sample_file_type_id, type FROM sample_file_type WHERE type = ?1",
        )?;
        let rows = statement.query_map(params![type_name], |row| {
            Ok(SampleFileType {
                id: row.get(0)?,
                type_name: row.get(1)?,
            })
        })?;
        Ok(Lookup::from_rows(collect(rows)?))
    }

    fn file_type_name(&self, file_type_id: i64) -> Result<Option<String>, LoaderError> {
        let mut statement = self
            .conn
            .prepare("SELECT type FROM sample_file_type WHERE sample_file_type_id = ?1")?;
        let rows = statement.query_map(params![file_type_id], |row| row.get::<_, String>(0))?;
        Ok(collect(rows)?.into_iter().next())
    }

    fn find_sample_file(
        &self,
        sample_id: i64,
        path: &str,
    ) -> Result<Lookup<SampleFile>, LoaderError> {
        let mut statement = self.conn.prepare(
            "SELECT sample_file_id, sample_id, file, sample_file_type_id FROM sample_file \
             WHERE sample_id = ?1 AND file = ?2",
        )?;
        let rows = statement.query_map(params![sample_id, path], sample_file_from_row)?;
        Ok(Lookup::from_rows(collect(rows)?))
    }

    fn insert_sample_file(
        &mut self,
        sample_id: i64,
        path: &str,
        file_type_id: i64,
    ) -> Result<SampleFile, LoaderError> {
        self.conn.execute(
            "INSERT INTO sample_file (sample_id, sample_file_type_id, file) VALUES (?1, ?2, ?3)",
            params![sample_id, file_type_id, path],
        )?;
        Ok(SampleFile {
            id: self.conn.last_insert_rowid(),
            sample_id,
            path: path.to_string(),
            file_type_id,
        })
    }

    fn update_sample_file_type(
        &mut self,
        sample_file_id: i64,
        file_type_id: i64,
    ) -> Result<(), LoaderError> {
        self.conn.execute(
            "UPDATE sample_file SET sample_file_type_id = ?1 WHERE sample_file_id = ?2",
            params![file_type_id, sample_file_id],
        )?;
        Ok(())
    }

    fn sample_files(&self) -> Result<Vec<SampleFile>, LoaderError> {
        let mut statement = self.conn.prepare(
            "SELECT sample_file_id, sample_id, file, sample_file_type_id FROM sample_file \
             ORDER BY sample_file_id",
        )?;
        let rows = statement.query_map([], sample_file_from_row)?;
        collect(rows)
    }
}

fn sample_file_from_row(row: &Row<'_>) -> rusqlite::Result<SampleFile> {
    Ok(SampleFile {
        id: row.get(0)?,
        sample_id: row.get(1)?,
        path: row.get(2)?,
        file_type_id: row.get(3)?,
    })
}
