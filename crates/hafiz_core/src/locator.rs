//! crates/hafiz_core/src/locator.rs
//!
//! Static reference data for the 604-page Madani print edition: where each surah
//! starts, how many verses it has, and, for the densest surahs, which verse opens
//! each of its pages.

use crate::domain::Surah;

/// Number of pages in the print edition. Resolved pages never exceed it.
pub const PAGE_COUNT: u16 = 604;

/// Lines printed on a full page of the edition.
pub const LINES_PER_PAGE: u8 = 15;

/// Version tag of the density table used for estimated pages.
pub const DENSITY_TABLE_VERSION: &str = "density-v1";

/// Average verses per page for a contiguous range of surahs.
///
/// A density of 0 means every verse of the surah is placed on its start page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensityBand {
    pub first_surah: u16,
    pub last_surah: u16,
    pub verses_per_page: u16,
}

const fn surah(number: u16, name: &'static str, start_page: u16, verse_count: u16) -> Surah {
    Surah {
        number,
        name,
        start_page,
        verse_count,
    }
}

const fn band(first_surah: u16, last_surah: u16, verses_per_page: u16) -> DensityBand {
    DensityBand {
        first_surah,
        last_surah,
        verses_per_page,
    }
}

//=========================================================================================
// Edition Data
//=========================================================================================

static SURAHS: [Surah; 114] = [
    surah(1, "Fatiha", 1, 7),
    surah(2, "Bakara", 2, 286),
    surah(3, "Al-i Imran", 50, 200),
    surah(4, "Nisa", 77, 176),
    surah(5, "Maide", 106, 120),
    surah(6, "En'am", 128, 165),
    surah(7, "A'raf", 151, 206),
    surah(8, "Enfal", 177, 75),
    surah(9, "Tevbe", 187, 129),
    surah(10, "Yunus", 208, 109),
    surah(11, "Hud", 221, 123),
    surah(12, "Yusuf", 235, 111),
    surah(13, "Ra'd", 249, 43),
    surah(14, "İbrahim", 255, 52),
    surah(15, "Hicr", 262, 99),
    surah(16, "Nahl", 267, 128),
    surah(17, "İsra", 282, 111),
    surah(18, "Kehf", 293, 110),
    surah(19, "Meryem", 305, 98),
    surah(20, "Taha", 312, 135),
    surah(21, "Enbiya", 322, 112),
    surah(22, "Hac", 332, 78),
    surah(23, "Mu'minun", 342, 118),
    surah(24, "Nur", 350, 64),
    surah(25, "Furkan", 359, 77),
    surah(26, "Şuara", 367, 227),
    surah(27, "Neml", 377, 93),
    surah(28, "Kasas", 385, 88),
    surah(29, "Ankebut", 396, 69),
    surah(30, "Rum", 404, 60),
    surah(31, "Lokman", 411, 34),
    surah(32, "Secde", 415, 30),
    surah(33, "Ahzab", 418, 73),
    surah(34, "Sebe", 428, 54),
    surah(35, "Fatır", 434, 45),
    surah(36, "Yasin", 440, 83),
    surah(37, "Saffat", 446, 182),
    surah(38, "Sad", 453, 88),
    surah(39, "Zümer", 458, 75),
    surah(40, "Mü'min", 467, 85),
    surah(41, "Fussilet", 477, 54),
    surah(42, "Şura", 483, 53),
    surah(43, "Zuhruf", 489, 89),
    surah(44, "Duhan", 496, 59),
    surah(45, "Casiye", 499, 37),
    surah(46, "Ahkaf", 502, 35),
    surah(47, "Muhammed", 507, 38),
    surah(48, "Fetih", 511, 29),
    surah(49, "Hucurat", 515, 18),
    surah(50, "Kaf", 518, 45),
    surah(51, "Zariyat", 520, 60),
    surah(52, "Tur", 523, 49),
    surah(53, "Necm", 526, 62),
    surah(54, "Kamer", 528, 55),
    surah(55, "Rahman", 531, 78),
    surah(56, "Vakıa", 534, 96),
    surah(57, "Hadid", 537, 29),
    surah(58, "Mücadele", 542, 22),
    surah(59, "Haşr", 545, 24),
    surah(60, "Mümtehine", 549, 13),
    surah(61, "Saf", 551, 14),
    surah(62, "Cuma", 553, 11),
    surah(63, "Münafikun", 554, 11),
    surah(64, "Teğabün", 556, 18),
    surah(65, "Talak", 558, 12),
    surah(66, "Tahrim", 560, 12),
    surah(67, "Mülk", 562, 30),
    surah(68, "Kalem", 564, 52),
    surah(69, "Hakka", 566, 52),
    surah(70, "Mearic", 568, 44),
    surah(71, "Nuh", 570, 28),
    surah(72, "Cin", 572, 28),
    surah(73, "Müzzemmil", 574, 20),
    surah(74, "Müddessir", 575, 56),
    surah(75, "Kıyame", 577, 40),
    surah(76, "İnsan", 578, 31),
    surah(77, "Mürselat", 580, 50),
    surah(78, "Nebe", 582, 40),
    surah(79, "Naziat", 583, 46),
    surah(80, "Abese", 585, 42),
    surah(81, "Tekvir", 586, 29),
    surah(82, "İnfitar", 587, 19),
    surah(83, "Mutaffifin", 587, 36),
    surah(84, "İnşikak", 589, 25),
    surah(85, "Büruc", 590, 22),
    surah(86, "Tarık", 591, 17),
    surah(87, "A'la", 591, 19),
    surah(88, "Gaşiye", 592, 26),
    surah(89, "Fecr", 593, 30),
    surah(90, "Beled", 594, 20),
    surah(91, "Şems", 595, 15),
    surah(92, "Leyl", 595, 21),
    surah(93, "Duha", 596, 11),
    surah(94, "İnşirah", 596, 8),
    surah(95, "Tin", 597, 8),
    surah(96, "Alak", 597, 19),
    surah(97, "Kadr", 598, 5),
    surah(98, "Beyyine", 598, 8),
    surah(99, "Zilzal", 599, 8),
    surah(100, "Adiyat", 599, 11),
    surah(101, "Karia", 600, 11),
    surah(102, "Tekasür", 600, 8),
    surah(103, "Asr", 601, 3),
    surah(104, "Hümeze", 601, 9),
    surah(105, "Fil", 601, 5),
    surah(106, "Kureyş", 602, 4),
    surah(107, "Maun", 602, 7),
    surah(108, "Kevser", 602, 3),
    surah(109, "Kafirun", 603, 6),
    surah(110, "Nasr", 603, 3),
    surah(111, "Tebbet", 603, 5),
    surah(112, "İhlas", 604, 4),
    surah(113, "Felak", 604, 5),
    surah(114, "Nas", 604, 6),
];

// First verse on each page of the surah; index 0 is the surah's start page.
static BAKARA_PAGES: [u16; 48] = [
    1, 6, 17, 25, 30, 38, 49, 58, 62, 70, 77, 84, 89, 94, 102, 106, 113, 120, 127, 135, 142,
    146, 154, 164, 170, 177, 182, 187, 191, 197, 203, 211, 216, 220, 225, 231, 234, 238, 246,
    249, 253, 257, 260, 265, 270, 275, 282, 283,
];

static AL_I_IMRAN_PAGES: [u16; 27] = [
    1, 10, 16, 23, 30, 38, 46, 53, 62, 71, 78, 84, 92, 101, 109, 116, 122, 133, 141, 149, 154,
    158, 166, 174, 181, 187, 195,
];

static NISA_PAGES: [u16; 30] = [
    1, 7, 12, 15, 20, 24, 27, 34, 38, 45, 52, 60, 66, 75, 80, 87, 92, 95, 102, 106, 114, 122,
    128, 135, 141, 148, 155, 163, 171, 176,
];

static MAIDE_PAGES: [u16; 22] = [
    1, 3, 6, 10, 14, 18, 24, 32, 37, 42, 46, 51, 58, 65, 71, 77, 83, 90, 96, 104, 109, 114,
];

static BREAKPOINTS: [(u16, &[u16]); 4] = [
    (2, &BAKARA_PAGES),
    (3, &AL_I_IMRAN_PAGES),
    (4, &NISA_PAGES),
    (5, &MAIDE_PAGES),
];

static DENSITY_V1: [DensityBand; 6] = [
    band(1, 9, 7),
    band(10, 29, 10),
    band(30, 57, 14),
    band(58, 77, 15),
    band(78, 89, 25),
    band(90, 114, 0),
];

static MADANI: LocatorTable = LocatorTable::new(&SURAHS, &BREAKPOINTS, &DENSITY_V1);

//=========================================================================================
// Lookup Table
//=========================================================================================

/// Read-only lookups over one print edition.
#[derive(Debug, Clone, Copy)]
pub struct LocatorTable {
    surahs: &'static [Surah],
    breakpoints: &'static [(u16, &'static [u16])],
    densities: &'static [DensityBand],
}

impl LocatorTable {
    pub const fn new(
        surahs: &'static [Surah],
        breakpoints: &'static [(u16, &'static [u16])],
        densities: &'static [DensityBand],
    ) -> Self {
        Self {
            surahs,
            breakpoints,
            densities,
        }
    }

    /// The deployed 604-page Madani table.
    pub fn madani() -> &'static LocatorTable {
        &MADANI
    }

    pub fn surah(&self, number: u16) -> Option<&'static Surah> {
        let index = usize::from(number.checked_sub(1)?);
        self.surahs.get(index).filter(|s| s.number == number)
    }

    pub fn surahs(&self) -> impl Iterator<Item = &'static Surah> {
        self.surahs.iter()
    }

    pub fn start_page(&self, number: u16) -> Option<u16> {
        self.surah(number).map(|s| s.start_page)
    }

    pub fn verse_count(&self, number: u16) -> Option<u16> {
        self.surah(number).map(|s| s.verse_count)
    }

    pub fn name(&self, number: u16) -> Option<&'static str> {
        self.surah(number).map(|s| s.name)
    }

    /// Curated page breakpoints, present only for a few long surahs.
    pub fn breakpoints(&self, number: u16) -> Option<&'static [u16]> {
        self.breakpoints
            .iter()
            .find(|(surah, _)| *surah == number)
            .map(|(_, verses)| *verses)
    }

    /// Highest page the surah can reach: the page where the next surah opens.
    pub fn last_page(&self, number: u16) -> Option<u16> {
        self.surah(number)?;
        Some(
            self.surah(number + 1)
                .map(|next| next.start_page)
                .unwrap_or(PAGE_COUNT),
        )
    }

    /// Verses per page used by the estimated strategy.
    pub fn density(&self, number: u16) -> Option<u16> {
        self.densities
            .iter()
            .find(|b| (b.first_surah..=b.last_surah).contains(&number))
            .map(|b| b.verses_per_page)
    }
}
