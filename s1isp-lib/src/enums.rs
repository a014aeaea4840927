//! Closed sets of codes appearing in ISP header fields.
//!
//! Every enum keeps an `Unknown` catch-all so reserved or not-yet-documented
//! codes survive a decode round-trip instead of rejecting flight data.

use std::fmt;

use serde::{Serialize, Serializer};

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal,)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// Reserved or undocumented code.
            Unknown(u8),
        }

        impl $name {
            #[must_use]
            pub fn from_code(code: u8) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }

            /// The raw code as it appears on the wire.
            #[must_use]
            pub fn code(self) -> u8 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Unknown(code) => code,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($label),)+
                    Self::Unknown(code) => write!(f, "unknown({code})"),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

code_enum! {
    /// ECC number, naming the instrument event control code program.
    EccNumber {
        /// Contingency: reserved for ground testing or mode upgrading.
        NotSet = 0 => "not_set",
        S1 = 1 => "s1",
        S2 = 2 => "s2",
        S3 = 3 => "s3",
        S4 = 4 => "s4",
        S5North = 5 => "s5_n",
        S6 = 6 => "s6",
        Iw = 8 => "iw",
        Wm = 9 => "wm",
        S5South = 10 => "s5_s",
        S1NoIcal = 11 => "s1_no_ical",
        S2NoIcal = 12 => "s2_no_ical",
        S3NoIcal = 13 => "s3_no_ical",
        S4NoIcal = 14 => "s4_no_ical",
        Rfc = 15 => "rfc",
        Test = 16 => "test",
        ElevationNotchS3 = 17 => "en_s3",
        AzimuthNotchS1 = 18 => "an_s1",
        AzimuthNotchS2 = 19 => "an_s2",
        AzimuthNotchS3 = 20 => "an_s3",
        AzimuthNotchS4 = 21 => "an_s4",
        AzimuthNotchS5North = 22 => "an_s5_n",
        AzimuthNotchS5South = 23 => "an_s5_s",
        AzimuthNotchS6 = 24 => "an_s6",
        S5NorthNoIcal = 25 => "s5_n_no_ical",
        S5SouthNoIcal = 26 => "s5_s_no_ical",
        S6NoIcal = 27 => "s6_no_ical",
        ElevationNotchS3NoIcal = 31 => "en_s3_no_ical",
        ElevationNotch = 32 => "en",
        AzimuthNotchS1NoIcal = 33 => "an_s1_no_ical",
        AzimuthNotchS3NoIcal = 34 => "an_s3_no_ical",
        AzimuthNotchS6NoIcal = 35 => "an_s6_no_ical",
        NoiseCharS1 = 37 => "nc_s1",
        NoiseCharS2 = 38 => "nc_s2",
        NoiseCharS3 = 39 => "nc_s3",
        NoiseCharS4 = 40 => "nc_s4",
        NoiseCharS5North = 41 => "nc_s5_n",
        NoiseCharS5South = 42 => "nc_s5_s",
        NoiseCharS6 = 43 => "nc_s6",
        NoiseCharEw = 44 => "nc_ew",
        NoiseCharIw = 45 => "nc_iw",
        NoiseCharWm = 46 => "nc_wm",
    }
}

code_enum! {
    /// Instrument test mode.
    TestMode {
        Default = 0 => "default",
        ContingencyRxmFullyOperational = 4 => "contingency_rxm_fully_operational",
        ContingencyRxmFullyBypassed = 5 => "contingency_rxm_fully_bypassed",
        Oper = 6 => "oper",
        Bypass = 7 => "bypass",
    }
}

code_enum! {
    /// Receive channel identifier.
    RxChannelId {
        RxV = 0 => "rxv",
        RxH = 1 => "rxh",
    }
}

code_enum! {
    /// On-board sample compression mode.
    BaqMode {
        Bypass = 0 => "bypass",
        Baq3 = 3 => "baq3",
        Baq4 = 4 => "baq4",
        Baq5 = 5 => "baq5",
        FdBaqMode0 = 12 => "fdbaq_mode_0",
        FdBaqMode1 = 13 => "fdbaq_mode_1",
        FdBaqMode2 = 14 => "fdbaq_mode_2",
    }
}

code_enum! {
    /// Range decimation filter selection.
    RangeDecimation {
        X3On4 = 0 => "x3_on_4",
        X2On3 = 1 => "x2_on_3",
        X5On9 = 3 => "x5_on_9",
        X4On9 = 4 => "x4_on_9",
        X3On8 = 5 => "x3_on_8",
        X1On3 = 6 => "x1_on_3",
        X1On6 = 7 => "x1_on_6",
        X3On7 = 8 => "x3_on_7",
        X5On16 = 9 => "x5_on_16",
        X3On26 = 10 => "x3_on_26",
        X4On11 = 11 => "x4_on_11",
    }
}

code_enum! {
    /// AOCS operational mode reported in attitude ancillary data.
    AocsOpMode {
        NoMode = 0 => "no_mode",
        NormalPointing = 5 => "npm",
        OrbitControl = 6 => "ocm",
    }
}

code_enum! {
    /// SAS antenna polarization configuration.
    Polarization {
        HTxOnly = 0 => "h_tx_only",
        HH = 1 => "h_h",
        HV = 2 => "h_v",
        HVh = 3 => "h_vh",
        VTxOnly = 4 => "v_tx_only",
        VH = 5 => "v_h",
        VV = 6 => "v_v",
        VVh = 7 => "v_vh",
    }
}

code_enum! {
    /// SAS temperature compensation configuration.
    TemperatureCompensation {
        FeOffTaOff = 0 => "fe_off_ta_off",
        FeOnTaOff = 1 => "fe_on_ta_off",
        FeOffTaOn = 2 => "fe_off_ta_on",
        FeOnTaOn = 3 => "fe_on_ta_on",
    }
}

code_enum! {
    /// SAS test mode flag carried in calibration SSB data.
    SasTestMode {
        SasTestModeActive = 0 => "sas_test_mode_active",
        NominalCalMode = 1 => "nominal_cal_mode",
    }
}

code_enum! {
    /// SAS calibration type.
    CalType {
        TxCal = 0 => "tx_cal",
        RxCal = 1 => "rx_cal",
        EpdnCal = 2 => "epdn_cal",
        TaCal = 3 => "ta_cal",
        ApdnCal = 4 => "apdn_cal",
        TxHCalIso = 7 => "tx_h_cal_iso",
    }
}

code_enum! {
    /// SES calibration mode.
    CalMode {
        Pcc2IcalInterleaved = 0 => "pcc2_ical_interleaved",
        Pcc2IcalPreamble = 1 => "pcc2_ical_preamble",
        Pcc32PhaseCodedCharacterization = 2 => "pcc32_phase_coded_characterization",
        Rf672PhaseCodedCharacterization = 3 => "rf672_phase_coded_characterization",
    }
}

code_enum! {
    /// SES signal type.
    SignalType {
        Echo = 0 => "echo",
        Noise = 1 => "noise",
        TxCal = 8 => "tx_cal",
        RxCal = 9 => "rx_cal",
        EpdnCal = 10 => "epdn_cal",
        TaCal = 11 => "ta_cal",
        ApdnCal = 12 => "apdn_cal",
        TxHCalIso = 15 => "tx_h_cal_iso",
    }
}

/// FDBAQ bit-rate code, selecting one of the five Huffman trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BrcCode {
    Brc0,
    Brc1,
    Brc2,
    Brc3,
    Brc4,
}

impl BrcCode {
    pub fn from_code(code: u8) -> crate::Result<Self> {
        match code {
            0 => Ok(Self::Brc0),
            1 => Ok(Self::Brc1),
            2 => Ok(Self::Brc2),
            3 => Ok(Self::Brc3),
            4 => Ok(Self::Brc4),
            value => Err(crate::Error::InvalidBrc { value }),
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Largest magnitude representable by this tree.
    #[must_use]
    pub fn max_magnitude(self) -> u8 {
        match self {
            Self::Brc0 => 3,
            Self::Brc1 => 4,
            Self::Brc2 => 6,
            Self::Brc3 => 9,
            Self::Brc4 => 15,
        }
    }
}

impl fmt::Display for BrcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "brc{}", self.code())
    }
}
