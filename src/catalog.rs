//! Relational store seam: entities, lookup results and the unit of work.

use std::ops::{Deref, DerefMut};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::warn;

use crate::error::LoaderError;

/// Outcome of a natural-key lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    NotFound,
    Found(T),
    MultipleFound(Vec<T>),
}

impl<T> Lookup<T> {
    pub fn from_rows(mut rows: Vec<T>) -> Self {
        match rows.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(rows.remove(0)),
            _ => Lookup::MultipleFound(rows),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Investigator {
    pub id: i64,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cruise {
    pub id: i64,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Natural key of a sample: the same name recurs across cruises and casts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SampleKey {
    pub cruise_id: i64,
    pub station_number: i64,
    pub cast_number: i64,
    pub sample_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub id: i64,
    pub cruise_id: i64,
    pub cruise_name: String,
    pub station_number: i64,
    pub cast_number: i64,
    pub sample_name: String,
    pub collection_start: Option<NaiveDateTime>,
    pub collection_time_zone: Option<String>,
    pub depth: Option<f64>,
    pub latitude_start: Option<f64>,
    pub longitude_start: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
    pub key: SampleKey,
    pub investigator_id: i64,
    pub collection_start: Option<NaiveDateTime>,
    pub collection_time_zone: String,
    pub depth: Option<f64>,
    pub latitude_start: Option<f64>,
    pub longitude_start: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleAttrType {
    pub id: i64,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleAttr {
    pub id: i64,
    pub sample_id: i64,
    pub attr_type_id: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFileType {
    pub id: i64,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleFile {
    pub id: i64,
    pub sample_id: i64,
    pub path: String,
    pub file_type_id: i64,
}

/// Session over the cruise/sample database.
///
/// Investigators, attribute types and file types are controlled vocabularies:
/// they are read here but seeded elsewhere.
pub trait Catalog {
    fn begin(&mut self) -> Result<(), LoaderError>;
    fn commit(&mut self) -> Result<(), LoaderError>;
    fn rollback(&mut self) -> Result<(), LoaderError>;

    fn find_investigator(&self, last_name: &str) -> Result<Lookup<Investigator>, LoaderError>;

    fn find_cruise(&self, name: &str) -> Result<Lookup<Cruise>, LoaderError>;
    fn insert_cruise(&mut self, name: &str) -> Result<Cruise, LoaderError>;

    fn find_sample(&self, key: &SampleKey) -> Result<Lookup<Sample>, LoaderError>;
    fn find_samples_by_name(&self, sample_name: &str) -> Result<Vec<Sample>, LoaderError>;
    fn samples_at_station(
        &self,
        cruise_name: &str,
        station_number: i64,
    ) -> Result<Vec<Sample>, LoaderError>;
    fn samples_for_investigator(&self, investigator_id: i64) -> Result<Vec<Sample>, LoaderError>;
    fn insert_sample(&mut self, sample: &NewSample) -> Result<Sample, LoaderError>;
    fn update_sample_position(
        &mut self,
        sample_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), LoaderError>;
    /// Removes a sample with its attributes, files and investigator links.
    fn delete_sample(&mut self, sample_id: i64) -> Result<(), LoaderError>;

    fn attribute_types(&self) -> Result<Vec<SampleAttrType>, LoaderError>;
    fn find_attributes(
        &self,
        sample_id: i64,
        attr_type_id: i64,
    ) -> Result<Vec<SampleAttr>, LoaderError>;
    fn count_attributes(&self, sample_id: i64) -> Result<usize, LoaderError>;
    fn insert_attribute(
        &mut self,
        sample_id: i64,
        attr_type_id: i64,
        value: &str,
    ) -> Result<SampleAttr, LoaderError>;
    fn update_attribute(&mut self, attr_id: i64, value: &str) -> Result<(), LoaderError>;

    fn find_file_type(&self, type_name: &str) -> Result<Lookup<SampleFileType>, LoaderError>;
    fn file_type_name(&self, file_type_id: i64) -> Result<Option<String>, LoaderError>;
    fn find_sample_file(
        &self,
        sample_id: i64,
        path: &str,
    ) -> Result<Lookup<SampleFile>, LoaderError>;
    fn insert_sample_file(
        &mut self,
        sample_id: i64,
        path: &str,
        file_type_id: i64,
    ) -> Result<SampleFile, LoaderError>;
    fn update_sample_file_type(
        &mut self,
        sample_file_id: i64,
        file_type_id: i64,
    ) -> Result<(), LoaderError>;
    fn sample_files(&self) -> Result<Vec<SampleFile>, LoaderError>;
}

/// Transaction scope: begins on acquisition and rolls back on drop unless
/// committed. A unit begun inside another one commits into its parent.
pub struct UnitOfWork<'a, C: Catalog + ?Sized> {
    catalog: &'a mut C,
    open: bool,
}

impl<'a, C: Catalog + ?Sized> UnitOfWork<'a, C> {
    pub fn begin(catalog: &'a mut C) -> Result<Self, LoaderError> {
        catalog.begin()?;
        Ok(Self {
            catalog,
            open: true,
        })
    }

    pub fn commit(mut self) -> Result<(), LoaderError> {
        self.catalog.commit()?;
        self.open = false;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), LoaderError> {
        self.open = false;
        self.catalog.rollback()
    }

    /// Commits when `persist` is set, otherwise discards every change.
    pub fn finish(self, persist: bool) -> Result<(), LoaderError> {
        if persist { self.commit() } else { self.rollback() }
    }
}

impl<C: Catalog + ?Sized> Deref for UnitOfWork<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.catalog
    }
}

impl<C: Catalog + ?Sized> DerefMut for UnitOfWork<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.catalog
    }
}

impl<C: Catalog + ?Sized> Drop for UnitOfWork<'_, C> {
    fn drop(&mut self) {
        if self.open
            && let Err(err) = self.catalog.rollback()
        {
            warn!(error = %err, "rollback failed");
        }
    }
}
