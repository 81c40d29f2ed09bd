//! Pure form validation.
//!
//! Everything in this module is synchronous and deterministic: a form goes
//! in, and either a validated draft comes out or the first failed rule does.
//! Drafts are the only values the submit path is allowed to persist, so an
//! invalid or partial record can never reach the data store.

use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    AppError, EquipmentForm, EquipmentRecord, EquipmentType, ErrorKind, ListingStatus, PriceUnit,
    ProfileForm, ProfileRecord, UserId, DATE_FORMAT, MAX_BIO_CHARS, MOBILE_NUMBER_DIGITS,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Please enter a valid {}-digit mobile number", MOBILE_NUMBER_DIGITS)]
    InvalidMobileNumber,
    #[error("Please enter a valid rental price greater than zero")]
    InvalidPrice,
    #[error("Please select an equipment type")]
    InvalidEquipmentType,
    #[error("Please choose how the price is charged (per hour or per day)")]
    InvalidPriceUnit,
    #[error("Please enter a valid {0} date (YYYY-MM-DD)")]
    InvalidDate(&'static str),
    #[error("Availability must start on or before the day it ends")]
    InvalidAvailabilityWindow,
    #[error("Bio must be {} characters or fewer", MAX_BIO_CHARS)]
    BioTooLong,
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

/// Strips everything except ASCII digits. The result is also the stored
/// representation of a mobile number.
#[must_use]
pub fn normalize_mobile(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

#[must_use]
pub fn is_valid_mobile(input: &str) -> bool {
    normalize_mobile(input).len() == MOBILE_NUMBER_DIGITS
}

pub fn parse_price(input: &str) -> Result<f64, ValidationError> {
    let price: f64 = input.trim().parse().map_err(|_| ValidationError::InvalidPrice)?;
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(ValidationError::InvalidPrice)
    }
}

pub fn parse_date(input: &str, field: &'static str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(field))
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// A profile that passed every rule. Field values are trimmed and the
/// mobile number is digit-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDraft {
    pub full_name: String,
    pub mobile_number: String,
    pub village: String,
    pub bio: String,
    pub experience_years: u32,
}

impl ProfileDraft {
    #[must_use]
    pub fn into_record(self, user_id: &UserId, avatar_url: Option<String>) -> ProfileRecord {
        ProfileRecord {
            id: user_id.as_str().to_string(),
            full_name: self.full_name,
            mobile_number: self.mobile_number,
            village: self.village,
            bio: self.bio,
            avatar_url,
            experience_years: self.experience_years,
        }
    }
}

pub fn profile_draft(form: &ProfileForm) -> Result<ProfileDraft, ValidationError> {
    let full_name = required("Full name", &form.full_name)?;

    if form.mobile_number.trim().is_empty() {
        return Err(ValidationError::Missing("Mobile number"));
    }
    let mobile_number = normalize_mobile(&form.mobile_number);
    if mobile_number.len() != MOBILE_NUMBER_DIGITS {
        return Err(ValidationError::InvalidMobileNumber);
    }

    let village = required("Village", &form.village)?;

    let bio = form.bio.trim().to_string();
    if bio.chars().count() > MAX_BIO_CHARS {
        return Err(ValidationError::BioTooLong);
    }

    // Experience is informational, not gating: unparseable input falls
    // back to the default rather than blocking the save.
    let experience_years = form.experience_years.trim().parse().unwrap_or(0);

    Ok(ProfileDraft {
        full_name,
        mobile_number,
        village,
        bio,
        experience_years,
    })
}

/// A listing that passed every rule, with parsed price, unit, and dates.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentDraft {
    pub name: String,
    pub equipment_type: EquipmentType,
    pub description: String,
    pub rental_price: f64,
    pub price_type: PriceUnit,
    pub availability_start: NaiveDate,
    pub availability_end: NaiveDate,
    pub location: String,
}

impl EquipmentDraft {
    #[must_use]
    pub fn into_record(self, owner_id: &UserId, photo_urls: Vec<String>) -> EquipmentRecord {
        EquipmentRecord {
            owner_id: owner_id.as_str().to_string(),
            name: self.name,
            equipment_type: self.equipment_type,
            description: self.description,
            photo_urls,
            rental_price: self.rental_price,
            price_type: self.price_type,
            availability_start: self.availability_start,
            availability_end: self.availability_end,
            location: self.location,
            status: ListingStatus::default(),
        }
    }
}

pub fn equipment_draft(form: &EquipmentForm) -> Result<EquipmentDraft, ValidationError> {
    let name = required("Equipment name", &form.name)?;

    let type_raw = form.equipment_type.trim();
    if type_raw.is_empty() {
        return Err(ValidationError::Missing("Equipment type"));
    }
    let equipment_type =
        EquipmentType::from_str(type_raw).ok_or(ValidationError::InvalidEquipmentType)?;

    let description = required("Description", &form.description)?;

    let rental_price = parse_price(&form.rental_price)?;

    let unit_raw = form.price_type.trim();
    if unit_raw.is_empty() {
        return Err(ValidationError::InvalidPriceUnit);
    }
    let price_type = PriceUnit::from_str(unit_raw).ok_or(ValidationError::InvalidPriceUnit)?;

    let availability_start = parse_date(&form.availability_start, "availability start")?;
    let availability_end = parse_date(&form.availability_end, "availability end")?;
    if availability_start > availability_end {
        return Err(ValidationError::InvalidAvailabilityWindow);
    }

    let location = required("Location", &form.location)?;

    Ok(EquipmentDraft {
        name,
        equipment_type,
        description,
        rental_price,
        price_type,
        availability_start,
        availability_end,
        location,
    })
}
