//! Catalogue of the datasets and background jobs the console API exposes.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    CompanyHouse,
    AddressMaster,
    Botsol,
    SocialScrape,
    AdultKeywords,
    PostcodeDistrict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMethod {
    /// Filters and pagination in the query string.
    Get,
    /// Filters and pagination in a JSON body.
    PostJson,
}

/// Where items and the pagination block sit in a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLayout {
    /// `{ success, data: [...], pagination: {...} }`
    Flat,
    /// `{ success, data: { <items>: [...], pagination: {...} } }`
    Nested { items: &'static str },
    /// `{ data: [...], page, total, totalPages }`
    TopLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEndpoint {
    pub path: &'static str,
    pub method: ListMethod,
    pub layout: ListLayout,
    pub filters: &'static [&'static str],
    pub cursor_supported: bool,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::CompanyHouse,
        Dataset::AddressMaster,
        Dataset::Botsol,
        Dataset::SocialScrape,
        Dataset::AdultKeywords,
        Dataset::PostcodeDistrict,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Dataset::CompanyHouse => "company-house",
            Dataset::AddressMaster => "address-master",
            Dataset::Botsol => "botsol",
            Dataset::SocialScrape => "social-scrape",
            Dataset::AdultKeywords => "adult-keywords",
            Dataset::PostcodeDistrict => "postcode-district",
        }
    }

    pub fn list(self) -> Option<ListEndpoint> {
        let endpoint = match self {
            Dataset::CompanyHouse => ListEndpoint {
                path: "/company-house/paginated",
                method: ListMethod::Get,
                layout: ListLayout::Flat,
                filters: &["searchCompany", "searchNumber", "searchPostcode"],
                cursor_supported: true,
            },
            Dataset::AddressMaster => ListEndpoint {
                path: "/address-master/data",
                method: ListMethod::Get,
                layout: ListLayout::Flat,
                filters: &["searchPostcode", "searchDistrict", "searchAddress"],
                cursor_supported: true,
            },
            Dataset::Botsol => ListEndpoint {
                path: "/botsol/paginated",
                method: ListMethod::Get,
                layout: ListLayout::Flat,
                filters: &["searchUrl"],
                cursor_supported: true,
            },
            Dataset::AdultKeywords => ListEndpoint {
                path: "/adult-keywords/references/paginated",
                method: ListMethod::Get,
                layout: ListLayout::Nested {
                    items: "references",
                },
                filters: &["matchType", "processed"],
                cursor_supported: false,
            },
            Dataset::PostcodeDistrict => ListEndpoint {
                path: "/postcode-district/search",
                method: ListMethod::PostJson,
                layout: ListLayout::TopLevel,
                filters: &["postcode", "district"],
                cursor_supported: false,
            },
            Dataset::SocialScrape => return None,
        };
        Some(endpoint)
    }

    /// Record-count endpoint answering `{ stats: <n> }`.
    pub fn stats_path(self) -> Option<&'static str> {
        match self {
            Dataset::CompanyHouse => Some("/company-house/stats"),
            Dataset::AddressMaster => Some("/address-master/stats"),
            Dataset::Botsol => Some("/botsol/stats"),
            Dataset::SocialScrape => Some("/social-scrape/stats"),
            Dataset::AdultKeywords => Some("/adult-keywords/stats"),
            Dataset::PostcodeDistrict => None,
        }
    }

    /// Delete-all endpoint and the confirmation body it requires.
    pub fn delete_all(self) -> Option<(&'static str, Option<&'static str>)> {
        match self {
            Dataset::CompanyHouse => Some((
                "/company-house/delete-all",
                Some("DELETE_ALL_COMPANY_HOUSE_DATA"),
            )),
            Dataset::AddressMaster => Some(("/address-master/delete-all", None)),
            _ => None,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown name '{0}'")]
pub struct UnknownName(pub String);

impl FromStr for Dataset {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dataset::ALL
            .into_iter()
            .find(|dataset| dataset.slug() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// Key under which a progress endpoint wraps its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEnvelope {
    Data,
    Progress,
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobEndpoint {
    pub start_path: &'static str,
    pub progress_path: &'static str,
    pub stop_path: Option<&'static str>,
    pub envelope: ProgressEnvelope,
    /// Progress and stop calls are scoped by the `processId` the start call returned.
    pub scoped_by_process: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    CompanyHouseImport,
    AddressMasterImport,
    BotsolImport,
    SocialScrapeImport,
    AdultKeywordMatching,
    BlacklistUpdate,
    PhoneNumberUpdate,
}

impl JobKind {
    pub const ALL: [JobKind; 7] = [
        JobKind::CompanyHouseImport,
        JobKind::AddressMasterImport,
        JobKind::BotsolImport,
        JobKind::SocialScrapeImport,
        JobKind::AdultKeywordMatching,
        JobKind::BlacklistUpdate,
        JobKind::PhoneNumberUpdate,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            JobKind::CompanyHouseImport => "company-house",
            JobKind::AddressMasterImport => "address-master",
            JobKind::BotsolImport => "botsol",
            JobKind::SocialScrapeImport => "social-scrape",
            JobKind::AdultKeywordMatching => "adult-keywords",
            JobKind::BlacklistUpdate => "blacklist",
            JobKind::PhoneNumberUpdate => "phone-numbers",
        }
    }

    pub fn endpoint(self) -> JobEndpoint {
        match self {
            JobKind::CompanyHouseImport => JobEndpoint {
                start_path: "/company-house/import",
                progress_path: "/company-house/import-progress",
                stop_path: Some("/company-house/stop-import"),
                envelope: ProgressEnvelope::Data,
                scoped_by_process: false,
            },
            JobKind::AddressMasterImport => JobEndpoint {
                start_path: "/address-master/import",
                progress_path: "/address-master/import-progress",
                stop_path: Some("/address-master/stop-import"),
                envelope: ProgressEnvelope::Data,
                scoped_by_process: false,
            },
            JobKind::BotsolImport => JobEndpoint {
                start_path: "/botsol/import",
                progress_path: "/botsol/import-progress",
                stop_path: None,
                envelope: ProgressEnvelope::Data,
                scoped_by_process: false,
            },
            JobKind::SocialScrapeImport => JobEndpoint {
                start_path: "/social-scrape/import",
                progress_path: "/social-scrape/import-progress",
                stop_path: None,
                envelope: ProgressEnvelope::Data,
                scoped_by_process: false,
            },
            JobKind::AdultKeywordMatching => JobEndpoint {
                start_path: "/adult-keywords/start-matching",
                progress_path: "/adult-keywords/matching-progress",
                stop_path: Some("/adult-keywords/stop-matching"),
                envelope: ProgressEnvelope::Progress,
                scoped_by_process: false,
            },
            JobKind::BlacklistUpdate => JobEndpoint {
                start_path: "/social-scrape/update-blacklist",
                progress_path: "/social-scrape/blacklist-progress",
                stop_path: None,
                envelope: ProgressEnvelope::Bare,
                scoped_by_process: true,
            },
            JobKind::PhoneNumberUpdate => JobEndpoint {
                start_path: "/social-scrape/update-phone-number",
                progress_path: "/social-scrape/phone-progress",
                stop_path: Some("/social-scrape/stop-phone-processing"),
                envelope: ProgressEnvelope::Bare,
                scoped_by_process: true,
            },
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for JobKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}
