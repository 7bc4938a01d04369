//! Built-in ray model for the Surveyor SVS stereo head.
//!
//! The rows are modelled from the stereo geometry, not measured on a
//! calibration rig. 107mm baseline, rows for disparities 2 to 40 pixels at
//! one pixel intervals, distances in 40mm cells. Each row is stored packed: the
//! distance cell of its first non-zero entry (`START`), its offset into the
//! value array (`INDEX`, one extra trailing entry), and probabilities
//! scaled by 10000 (`VALUES`).

use super::{INTEGER_SCALE, RayModelLookup};

/// Grid cell size the table was modelled for.
pub const SURVEYOR_SVS_CELL_MM: f32 = 40.0;

/// Stereo baseline of the Surveyor SVS head.
pub const SURVEYOR_SVS_BASELINE_MM: f32 = 107.0;

/// Disparity step between consecutive rows.
pub const SURVEYOR_SVS_INTERVAL_PIXELS: f32 = 1.0;

impl RayModelLookup {
    /// Lookup table for the Surveyor SVS stereo head.
    pub fn surveyor_svs() -> Self {
        let rows: Vec<Vec<f32>> = SURVEYOR_SVS_START
            .iter()
            .enumerate()
            .map(|(r, &start)| {
                let values = &SURVEYOR_SVS_VALUES
                    [SURVEYOR_SVS_INDEX[r] as usize..SURVEYOR_SVS_INDEX[r + 1] as usize];
                let mut row = vec![0.0; start as usize];
                row.extend(values.iter().map(|&v| v as f32 / INTEGER_SCALE));
                row
            })
            .collect();

        let mut lookup = RayModelLookup::new(SURVEYOR_SVS_CELL_MM);
        lookup.fill(&rows, SURVEYOR_SVS_INTERVAL_PIXELS);
        log::debug!(
            "Loaded Surveyor SVS ray model: {} rows, interval {} px",
            rows.len(),
            SURVEYOR_SVS_INTERVAL_PIXELS
        );
        lookup
    }
}

const SURVEYOR_SVS_START: [u16; 39] = [
    113, 88, 73, 62, 54, 47, 43, 39, 35, 33, 30, 28, 26, 25, 23, 22,
    21, 20, 19, 18, 17, 17, 16, 15, 15, 14, 14, 13, 13, 12, 12, 12,
    11, 11, 11, 10, 10, 10, 10,
];

const SURVEYOR_SVS_INDEX: [u16; 40] = [
    0, 287, 483, 591, 660, 708, 744, 771, 793, 811, 826, 839, 850, 860, 868, 876,
    883, 889, 895, 900, 905, 910, 914, 918, 922, 925, 929, 932, 935, 938, 941, 944,
    946, 949, 951, 953, 956, 958, 960, 962,
];

const SURVEYOR_SVS_VALUES: [u16; 962] = [
    1, 1, 1, 1, 1, 1, 2, 2, 2, 3, 3, 4, 4, 5, 5, 6,
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 20, 22, 23, 25, 27,
    28, 30, 32, 34, 36, 37, 39, 41, 43, 45, 47, 49, 51, 53, 54, 56,
    58, 60, 61, 63, 65, 66, 68, 69, 71, 72, 73, 75, 76, 77, 78, 79,
    80, 81, 81, 82, 83, 83, 84, 84, 85, 85, 85, 86, 86, 86, 86, 86,
    86, 86, 86, 86, 85, 85, 85, 85, 84, 84, 83, 83, 82, 82, 81, 81,
    80, 79, 79, 78, 77, 77, 76, 75, 74, 74, 73, 72, 71, 70, 70, 69,
    68, 67, 66, 65, 65, 64, 63, 62, 61, 60, 59, 59, 58, 57, 56, 55,
    54, 54, 53, 52, 51, 50, 50, 49, 48, 47, 47, 46, 45, 44, 44, 43,
    42, 42, 41, 40, 40, 39, 38, 38, 37, 36, 36, 35, 35, 34, 33, 33,
    32, 32, 31, 31, 30, 30, 29, 29, 28, 28, 27, 27, 26, 26, 25, 25,
    24, 24, 24, 23, 23, 22, 22, 22, 21, 21, 20, 20, 20, 19, 19, 19,
    18, 18, 18, 17, 17, 17, 17, 16, 16, 16, 15, 15, 15, 15, 14, 14,
    14, 14, 13, 13, 13, 13, 13, 12, 12, 12, 12, 12, 11, 11, 11, 11,
    11, 10, 10, 10, 10, 10, 10, 9, 9, 9, 9, 9, 9, 9, 8, 8,
    8, 8, 8, 8, 8, 7, 7, 7, 7, 7, 7, 7, 7, 7, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 5, 5, 5, 5, 4, 4, 4, 4, 4, 4, 4, 4, 4, 1,
    1, 1, 1, 2, 3, 4, 5, 6, 8, 9, 12, 14, 17, 21, 24, 28,
    33, 38, 43, 49, 55, 61, 67, 74, 81, 88, 95, 101, 108, 115, 122, 128,
    134, 140, 145, 150, 155, 159, 163, 166, 169, 171, 173, 175, 176, 177, 177, 177,
    176, 175, 174, 172, 170, 168, 166, 163, 160, 157, 154, 151, 147, 144, 140, 136,
    133, 129, 125, 121, 117, 114, 110, 106, 103, 99, 95, 92, 89, 85, 82, 79,
    76, 73, 70, 67, 64, 62, 59, 57, 54, 52, 50, 48, 45, 44, 42, 40,
    38, 36, 35, 33, 32, 30, 29, 28, 26, 25, 24, 23, 22, 21, 20, 19,
    18, 17, 17, 16, 15, 14, 14, 13, 12, 12, 11, 11, 10, 10, 9, 9,
    9, 8, 8, 7, 7, 7, 6, 6, 6, 6, 5, 5, 5, 5, 5, 4,
    4, 4, 4, 4, 3, 3, 3, 3, 3, 3, 3, 3, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 2, 4, 6, 8, 12, 16, 22, 30, 39, 50, 62,
    76, 91, 108, 125, 144, 163, 182, 200, 218, 235, 251, 265, 277, 288, 296, 302,
    306, 307, 307, 305, 301, 295, 288, 280, 271, 261, 250, 239, 227, 215, 203, 192,
    180, 169, 157, 147, 136, 126, 117, 108, 100, 92, 84, 78, 71, 65, 59, 54,
    50, 45, 41, 37, 34, 31, 28, 25, 23, 21, 19, 17, 16, 14, 13, 12,
    10, 9, 9, 8, 7, 6, 6, 5, 5, 4, 4, 3, 3, 3, 3, 2,
    2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    2, 4, 7, 13, 21, 32, 49, 70, 96, 127, 163, 203, 245, 288, 329, 368,
    402, 431, 453, 467, 474, 474, 467, 454, 435, 413, 388, 360, 331, 302, 273, 245,
    219, 194, 171, 149, 130, 113, 97, 84, 72, 61, 52, 44, 37, 31, 26, 22,
    19, 15, 13, 11, 9, 7, 6, 5, 4, 4, 3, 2, 2, 2, 1, 1,
    1, 1, 1, 1, 1, 3, 8, 16, 32, 56, 93, 144, 208, 283, 366, 449,
    527, 593, 643, 672, 679, 667, 637, 593, 540, 481, 420, 361, 304, 253, 207, 168,
    134, 106, 83, 65, 50, 38, 29, 22, 17, 12, 9, 7, 5, 4, 3, 2,
    1, 1, 1, 1, 1, 2, 6, 18, 42, 88, 163, 269, 403, 552, 696, 815,
    893, 921, 898, 834, 739, 629, 516, 409, 315, 236, 172, 123, 86, 59, 40, 27,
    17, 11, 7, 5, 3, 2, 1, 1, 2, 10, 33, 89, 199, 375, 605, 851,
    1058, 1178, 1189, 1098, 938, 746, 557, 393, 264, 169, 104, 62, 36, 20, 11, 6,
    3, 2, 1, 3, 17, 66, 196, 446, 804, 1180, 1444, 1504, 1360, 1084, 774, 501,
    297, 164, 84, 41, 19, 8, 4, 1, 1, 1, 8, 49, 199, 551, 1092, 1617,
    1854, 1702, 1286, 820, 451, 218, 94, 37, 13, 4, 1, 7, 63, 307, 904, 1712,
    2211, 2053, 1433, 782, 345, 127, 40, 11, 3, 1, 1, 28, 232, 935, 2041, 2641,
    2185, 1233, 502, 155, 38, 8, 1, 2, 54, 477, 1732, 2975, 2707, 1437, 483, 110,
    18, 2, 1, 50, 595, 2323, 3538, 2437, 860, 173, 22, 2, 17, 425, 2396, 4015,
    2434, 627, 79, 6, 1, 124, 1654, 4385, 3069, 700, 63, 3, 6, 471, 3574, 4541,
    1299, 105, 3, 18, 1099, 5188, 3302, 382, 10, 29, 1788, 6014, 2071, 97, 1, 26,
    2205, 6393, 1350, 27, 11, 2107, 6803, 1068, 10, 2, 1461, 7387, 1145, 6, 599, 7684,
    1710, 7, 93, 6623, 3268, 16, 2, 3618, 6307, 73, 668, 8834, 498, 11, 6904, 3084,
    1, 1431, 8507, 62, 8, 8238, 1753, 1265, 8718, 17, 1, 8043, 1957, 324, 9654, 21,
    5611, 4389, 4, 9839, 156, 912, 9088, 7475, 2525, 1, 9961, 38, 345, 9655, 5721, 4279,
    9854, 146,
];
