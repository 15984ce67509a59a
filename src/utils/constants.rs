// src/utils/constants.rs

/// Tokens need at least this many letters to count as significant.
pub const MIN_TOKEN_LENGTH: usize = 4;

/// Department codes are left-padded with zeros to this width.
pub const DIVISION_CODE_WIDTH: usize = 2;

/// Generic words that appear in too many establishment names to discriminate.
pub const NAME_STOPWORDS: [&str; 23] = [
    "CENTRE",
    "GENERAL",
    "REGIONAL",
    "UNIVERSITAIRE",
    "PUBLIC",
    "PRIVE",
    "ETABLISSEMENT",
    "INSTITUTION",
    "FONDATION",
    "ASSOCIATION",
    "MAISON",
    "RESIDENCE",
    "GROUPE",
    "SECTEUR",
    "UNITE",
    "SERVICE",
    "DEPARTEMENT",
    "MEDICO",
    "SOCIAL",
    "SANTE",
    "SOINS",
    "MEDICAL",
    "MEDICALE",
];

/// Hospital abbreviations kept in registry names, with the words they stand for.
/// The expansion only lists words that survive tokenization.
pub const HOSPITAL_ABBREVIATIONS: [(&str, &[&str]); 17] = [
    ("CHU", &["HOSPITALIER"]),
    ("CHR", &["HOSPITALIER"]),
    ("CHRU", &["HOSPITALIER"]),
    ("CHI", &["HOSPITALIER", "INTERCOMMUNAL"]),
    ("CHS", &["HOSPITALIER", "SPECIALISE"]),
    ("CHG", &["HOSPITALIER"]),
    ("CH", &["HOSPITALIER"]),
    ("APHP", &["ASSISTANCE", "PUBLIQUE", "HOPITAUX"]),
    ("HCL", &["HOSPICES", "CIVILS"]),
    ("GHL", &["HOSPITALIER"]),
    ("GHT", &["HOSPITALIER", "TERRITOIRE"]),
    ("GHRMSA", &["HOSPITALIER"]),
    ("GCSMS", &["COOPERATION"]),
    ("HAD", &["HOSPITALISATION", "DOMICILE"]),
    ("SSR", &["SUITE", "READAPTATION"]),
    ("EHPAD", &["HEBERGEMENT", "PERSONNES", "AGEES", "DEPENDANTES"]),
    ("USLD", &["LONGUE", "DUREE"]),
];

/// Department names (accent-free, single-spaced) and their codes.
pub const DEPARTMENT_CODES: [(&str, &str); 103] = [
    ("AIN", "01"),
    ("AISNE", "02"),
    ("ALLIER", "03"),
    ("ALPES DE HAUTE PROVENCE", "04"),
    ("HAUTES ALPES", "05"),
    ("ALPES MARITIMES", "06"),
    ("ARDECHE", "07"),
    ("ARDENNES", "08"),
    ("ARIEGE", "09"),
    ("AUBE", "10"),
    ("AUDE", "11"),
    ("AVEYRON", "12"),
    ("BOUCHES DU RHONE", "13"),
    ("CALVADOS", "14"),
    ("CANTAL", "15"),
    ("CHARENTE", "16"),
    ("CHARENTE MARITIME", "17"),
    ("CHER", "18"),
    ("CORREZE", "19"),
    ("CORSE DU SUD", "2A"),
    ("HAUTE CORSE", "2B"),
    ("COTE D OR", "21"),
    ("COTES D ARMOR", "22"),
    ("CREUSE", "23"),
    ("DORDOGNE", "24"),
    ("DOUBS", "25"),
    ("DROME", "26"),
    ("EURE", "27"),
    ("EURE ET LOIR", "28"),
    ("FINISTERE", "29"),
    ("GARD", "30"),
    ("HAUTE GARONNE", "31"),
    ("GERS", "32"),
    ("GIRONDE", "33"),
    ("HERAULT", "34"),
    ("ILLE ET VILAINE", "35"),
    ("INDRE", "36"),
    ("INDRE ET LOIRE", "37"),
    ("ISERE", "38"),
    ("JURA", "39"),
    ("LANDES", "40"),
    ("LOIR ET CHER", "41"),
    ("LOIRE", "42"),
    ("HAUTE LOIRE", "43"),
    ("LOIRE ATLANTIQUE", "44"),
    ("LOIRET", "45"),
    ("LOT", "46"),
    ("LOT ET GARONNE", "47"),
    ("LOZERE", "48"),
    ("MAINE ET LOIRE", "49"),
    ("MANCHE", "50"),
    ("MARNE", "51"),
    ("HAUTE MARNE", "52"),
    ("MAYENNE", "53"),
    ("MEURTHE ET MOSELLE", "54"),
    ("MEUSE", "55"),
    ("MORBIHAN", "56"),
    ("MOSELLE", "57"),
    ("NIEVRE", "58"),
    ("NORD", "59"),
    ("OISE", "60"),
    ("ORNE", "61"),
    ("PAS DE CALAIS", "62"),
    ("PUY DE DOME", "63"),
    ("PYRENEES ATLANTIQUES", "64"),
    ("HAUTES PYRENEES", "65"),
    ("PYRENEES ORIENTALES", "66"),
    ("BAS RHIN", "67"),
    ("HAUT RHIN", "68"),
    ("RHONE", "69"),
    ("HAUTE SAONE", "70"),
    ("SAONE ET LOIRE", "71"),
    ("SARTHE", "72"),
    ("SAVOIE", "73"),
    ("HAUTE SAVOIE", "74"),
    ("PARIS", "75"),
    ("SEINE MARITIME", "76"),
    ("SEINE ET MARNE", "77"),
    ("YVELINES", "78"),
    ("DEUX SEVRES", "79"),
    ("SOMME", "80"),
    ("TARN", "81"),
    ("TARN ET GARONNE", "82"),
    ("VAR", "83"),
    ("VAUCLUSE", "84"),
    ("VENDEE", "85"),
    ("VIENNE", "86"),
    ("HAUTE VIENNE", "87"),
    ("VOSGES", "88"),
    ("YONNE", "89"),
    ("TERRITOIRE DE BELFORT", "90"),
    ("ESSONNE", "91"),
    ("HAUTS DE SEINE", "92"),
    ("SEINE ST DENIS", "93"),
    ("SEINE SAINT DENIS", "93"),
    ("VAL DE MARNE", "94"),
    ("VAL D OISE", "95"),
    ("GUADELOUPE", "971"),
    ("MARTINIQUE", "972"),
    ("GUYANE", "973"),
    ("LA REUNION", "974"),
    ("REUNION", "974"),
    ("MAYOTTE", "976"),
];

/// Confidence given when geography alone leaves a single identifier.
pub const SINGLE_CANDIDATE_CONFIDENCE: u8 = 95;
/// Confidence of a unique match on every required token.
pub const TOKEN_ALL_CONFIDENCE: u8 = 90;
/// Confidence of a unique match on at least one required token.
pub const TOKEN_ANY_CONFIDENCE: u8 = 75;

/// Confidence assigned when the oracle reply cannot be used and the first
/// candidate is taken instead.
pub const ORACLE_DEGRADED_CONFIDENCE: u8 = 50;
/// Confidence assigned when the oracle picks a candidate without scoring it
/// and the coherence follow-up is disabled or unusable.
pub const DEFAULT_COHERENCE_CONFIDENCE: u8 = 75;

pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;
pub const DEFAULT_ORACLE_MAX_REQUESTS: usize = 50;
pub const DEFAULT_ORACLE_WINDOW_SECS: u64 = 60;
