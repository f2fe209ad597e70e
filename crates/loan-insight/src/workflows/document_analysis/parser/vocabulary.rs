//! Closed keyword vocabularies. Every entry is matched as a plain substring of the lowercased
//! document, so short entries such as `ca` or `ac` fire inside longer words. Changing an entry
//! changes classifier output.

pub(crate) const HIGHLY_SKILLED_JOBS: &[&str] = &[
    "engineer",
    "doctor",
    "lawyer",
    "architect",
    "professor",
    "surgeon",
    "manager",
    "director",
    "ceo",
    "cfo",
    "cto",
    "executive",
    "vp",
    "consultant",
    "analyst",
    "scientist",
    "researcher",
    "specialist",
    "chartered accountant",
    "ca",
    "mba",
    "phd",
    "md",
];

pub(crate) const SKILLED_JOBS: &[&str] = &[
    "technician",
    "nurse",
    "teacher",
    "accountant",
    "programmer",
    "developer",
    "electrician",
    "plumber",
    "mechanic",
    "carpenter",
    "chef",
    "cook",
    "officer",
    "supervisor",
    "coordinator",
    "administrator",
    "designer",
    "clerk",
    "cashier",
    "operator",
    "driver",
    "salesman",
];

pub(crate) const UNSKILLED_JOBS: &[&str] = &[
    "helper",
    "assistant",
    "cleaner",
    "guard",
    "security",
    "laborer",
    "labourer",
    "worker",
    "peon",
    "attendant",
    "watchman",
    "housekeeping",
    "daily wage",
];

pub(crate) const PURPOSE_BUSINESS: &[&str] = &[
    "business",
    "enterprise",
    "startup",
    "commercial",
    "shop",
    "office",
];

pub(crate) const PURPOSE_CAR: &[&str] = &[
    "car",
    "vehicle",
    "automobile",
    "auto",
    "bike",
    "motorcycle",
];

pub(crate) const PURPOSE_DOMESTIC_APPLIANCES: &[&str] = &[
    "appliance",
    "refrigerator",
    "fridge",
    "washing machine",
    "microwave",
    "ac",
    "air conditioner",
];

pub(crate) const PURPOSE_EDUCATION: &[&str] = &[
    "education",
    "study",
    "course",
    "tuition",
    "school",
    "college",
    "university",
    "training",
];

pub(crate) const PURPOSE_FURNITURE: &[&str] = &[
    "furniture",
    "equipment",
    "furnishing",
    "sofa",
    "bed",
    "table",
];

pub(crate) const PURPOSE_RADIO_TV: &[&str] = &[
    "radio",
    "tv",
    "television",
    "electronics",
    "audio",
    "video",
];

pub(crate) const PURPOSE_REPAIRS: &[&str] = &["repair", "renovation", "maintenance", "fix", "remodel"];
