//! Built-in worksheet function table
//!
//! Maps each function name to its BIFF function index, its argument count
//! (fixed or variable) and whether it is volatile. Names are stored in
//! upper case.

use phf::phf_map;

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(u8),
    /// Emitted with an explicit argument count (`tFuncVar`)
    Variable,
}

/// One entry of the function table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub index: u16,
    pub arity: Arity,
    /// Formulas calling it start with `tAttrVolatile`
    pub volatile: bool,
}

const fn fixed(index: u16, args: u8, volatile: bool) -> FunctionSpec {
    FunctionSpec {
        index,
        arity: Arity::Fixed(args),
        volatile,
    }
}

const fn var(index: u16, volatile: bool) -> FunctionSpec {
    FunctionSpec {
        index,
        arity: Arity::Variable,
        volatile,
    }
}

static FUNCTIONS: phf::Map<&'static str, FunctionSpec> = phf_map! {
    "COUNT" => var(0, false),
    "IF" => var(1, false),
    "ISNA" => fixed(2, 1, false),
    "ISERROR" => fixed(3, 1, false),
    "SUM" => var(4, false),
    "AVERAGE" => var(5, false),
    "MIN" => var(6, false),
    "MAX" => var(7, false),
    "ROW" => var(8, false),
    "COLUMN" => var(9, false),
    "NA" => fixed(10, 0, false),
    "NPV" => var(11, false),
    "STDEV" => var(12, false),
    "DOLLAR" => var(13, false),
    "FIXED" => var(14, false),
    "SIN" => fixed(15, 1, false),
    "COS" => fixed(16, 1, false),
    "TAN" => fixed(17, 1, false),
    "ATAN" => fixed(18, 1, false),
    "PI" => fixed(19, 0, false),
    "SQRT" => fixed(20, 1, false),
    "EXP" => fixed(21, 1, false),
    "LN" => fixed(22, 1, false),
    "LOG10" => fixed(23, 1, false),
    "ABS" => fixed(24, 1, false),
    "INT" => fixed(25, 1, false),
    "SIGN" => fixed(26, 1, false),
    "ROUND" => fixed(27, 2, false),
    "LOOKUP" => var(28, false),
    "INDEX" => var(29, false),
    "REPT" => fixed(30, 2, false),
    "MID" => fixed(31, 3, false),
    "LEN" => fixed(32, 1, false),
    "VALUE" => fixed(33, 1, false),
    "TRUE" => fixed(34, 0, false),
    "FALSE" => fixed(35, 0, false),
    "AND" => var(36, false),
    "OR" => var(37, false),
    "NOT" => fixed(38, 1, false),
    "MOD" => fixed(39, 2, false),
    "DCOUNT" => fixed(40, 3, false),
    "DSUM" => fixed(41, 3, false),
    "DAVERAGE" => fixed(42, 3, false),
    "DMIN" => fixed(43, 3, false),
    "DMAX" => fixed(44, 3, false),
    "DSTDEV" => fixed(45, 3, false),
    "VAR" => var(46, false),
    "DVAR" => fixed(47, 3, false),
    "TEXT" => fixed(48, 2, false),
    "LINEST" => var(49, false),
    "TREND" => var(50, false),
    "LOGEST" => var(51, false),
    "GROWTH" => var(52, false),
    "PV" => var(56, false),
    "FV" => var(57, false),
    "NPER" => var(58, false),
    "PMT" => var(59, false),
    "RATE" => var(60, false),
    "MIRR" => fixed(61, 3, false),
    "IRR" => var(62, false),
    "RAND" => fixed(63, 0, true),
    "MATCH" => var(64, false),
    "DATE" => fixed(65, 3, false),
    "TIME" => fixed(66, 3, false),
    "DAY" => fixed(67, 1, false),
    "MONTH" => fixed(68, 1, false),
    "YEAR" => fixed(69, 1, false),
    "WEEKDAY" => var(70, false),
    "HOUR" => fixed(71, 1, false),
    "MINUTE" => fixed(72, 1, false),
    "SECOND" => fixed(73, 1, false),
    "NOW" => fixed(74, 0, true),
    "AREAS" => fixed(75, 1, false),
    "ROWS" => fixed(76, 1, false),
    "COLUMNS" => fixed(77, 1, false),
    "OFFSET" => var(78, true),
    "SEARCH" => var(82, false),
    "TRANSPOSE" => fixed(83, 1, false),
    "TYPE" => fixed(86, 1, false),
    "ATAN2" => fixed(97, 2, false),
    "ASIN" => fixed(98, 1, false),
    "ACOS" => fixed(99, 1, false),
    "CHOOSE" => var(100, false),
    "HLOOKUP" => var(101, false),
    "VLOOKUP" => var(102, false),
    "ISREF" => fixed(105, 1, false),
    "LOG" => var(109, false),
    "CHAR" => fixed(111, 1, false),
    "LOWER" => fixed(112, 1, false),
    "UPPER" => fixed(113, 1, false),
    "PROPER" => fixed(114, 1, false),
    "LEFT" => var(115, false),
    "RIGHT" => var(116, false),
    "EXACT" => fixed(117, 2, false),
    "TRIM" => fixed(118, 1, false),
    "REPLACE" => fixed(119, 4, false),
    "SUBSTITUTE" => var(120, false),
    "CODE" => fixed(121, 1, false),
    "FIND" => var(124, false),
    "CELL" => var(125, true),
    "ISERR" => fixed(126, 1, false),
    "ISTEXT" => fixed(127, 1, false),
    "ISNUMBER" => fixed(128, 1, false),
    "ISBLANK" => fixed(129, 1, false),
    "T" => fixed(130, 1, false),
    "N" => fixed(131, 1, false),
    "DATEVALUE" => fixed(140, 1, false),
    "TIMEVALUE" => fixed(141, 1, false),
    "SLN" => fixed(142, 3, false),
    "SYD" => fixed(143, 4, false),
    "DDB" => var(144, false),
    "INDIRECT" => var(148, true),
    "CALL" => var(150, false),
    "CLEAN" => fixed(162, 1, false),
    "MDETERM" => fixed(163, 1, false),
    "MINVERSE" => fixed(164, 1, false),
    "MMULT" => fixed(165, 2, false),
    "IPMT" => var(167, false),
    "PPMT" => var(168, false),
    "COUNTA" => var(169, false),
    "PRODUCT" => var(183, false),
    "FACT" => fixed(184, 1, false),
    "DPRODUCT" => fixed(189, 3, false),
    "ISNONTEXT" => fixed(190, 1, false),
    "STDEVP" => var(193, false),
    "VARP" => var(194, false),
    "DSTDEVP" => fixed(195, 3, false),
    "DVARP" => fixed(196, 3, false),
    "TRUNC" => var(197, false),
    "ISLOGICAL" => fixed(198, 1, false),
    "DCOUNTA" => fixed(199, 3, false),
    "ROUNDUP" => fixed(212, 2, false),
    "ROUNDDOWN" => fixed(213, 2, false),
    "RANK" => var(216, false),
    "ADDRESS" => var(219, false),
    "DAYS360" => var(220, false),
    "TODAY" => fixed(221, 0, true),
    "VDB" => var(222, false),
    "MEDIAN" => var(227, false),
    "SUMPRODUCT" => var(228, false),
    "SINH" => fixed(229, 1, false),
    "COSH" => fixed(230, 1, false),
    "TANH" => fixed(231, 1, false),
    "ASINH" => fixed(232, 1, false),
    "ACOSH" => fixed(233, 1, false),
    "ATANH" => fixed(234, 1, false),
    "DGET" => fixed(235, 3, false),
    "INFO" => fixed(244, 1, true),
    "DB" => var(247, false),
    "FREQUENCY" => fixed(252, 2, false),
    "ERROR.TYPE" => fixed(261, 1, false),
    "REGISTER.ID" => var(267, false),
    "AVEDEV" => var(269, false),
    "BETADIST" => var(270, false),
    "GAMMALN" => fixed(271, 1, false),
    "BETAINV" => var(272, false),
    "BINOMDIST" => fixed(273, 4, false),
    "CHIDIST" => fixed(274, 2, false),
    "CHIINV" => fixed(275, 2, false),
    "COMBIN" => fixed(276, 2, false),
    "CONFIDENCE" => fixed(277, 3, false),
    "CRITBINOM" => fixed(278, 3, false),
    "EVEN" => fixed(279, 1, false),
    "EXPONDIST" => fixed(280, 3, false),
    "FDIST" => fixed(281, 3, false),
    "FINV" => fixed(282, 3, false),
    "FISHER" => fixed(283, 1, false),
    "FISHERINV" => fixed(284, 1, false),
    "FLOOR" => fixed(285, 2, false),
    "GAMMADIST" => fixed(286, 4, false),
    "GAMMAINV" => fixed(287, 3, false),
    "CEILING" => fixed(288, 2, false),
    "HYPGEOMDIST" => fixed(289, 4, false),
    "LOGNORMDIST" => fixed(290, 3, false),
    "LOGINV" => fixed(291, 3, false),
    "NEGBINOMDIST" => fixed(292, 3, false),
    "NORMDIST" => fixed(293, 4, false),
    "NORMSDIST" => fixed(294, 1, false),
    "NORMINV" => fixed(295, 3, false),
    "NORMSINV" => fixed(296, 1, false),
    "STANDARDIZE" => fixed(297, 3, false),
    "ODD" => fixed(298, 1, false),
    "PERMUT" => fixed(299, 2, false),
    "POISSON" => fixed(300, 3, false),
    "TDIST" => fixed(301, 3, false),
    "WEIBULL" => fixed(302, 4, false),
    "SUMXMY2" => fixed(303, 2, false),
    "SUMX2MY2" => fixed(304, 2, false),
    "SUMX2PY2" => fixed(305, 2, false),
    "CHITEST" => fixed(306, 2, false),
    "CORREL" => fixed(307, 2, false),
    "COVAR" => fixed(308, 2, false),
    "FORECAST" => fixed(309, 3, false),
    "FTEST" => fixed(310, 2, false),
    "INTERCEPT" => fixed(311, 2, false),
    "PEARSON" => fixed(312, 2, false),
    "RSQ" => fixed(313, 2, false),
    "STEYX" => fixed(314, 2, false),
    "SLOPE" => fixed(315, 2, false),
    "TTEST" => fixed(316, 4, false),
    "PROB" => var(317, false),
    "DEVSQ" => var(318, false),
    "GEOMEAN" => var(319, false),
    "HARMEAN" => var(320, false),
    "SUMSQ" => var(321, false),
    "KURT" => var(322, false),
    "SKEW" => var(323, false),
    "ZTEST" => var(324, false),
    "LARGE" => fixed(325, 2, false),
    "SMALL" => fixed(326, 2, false),
    "QUARTILE" => fixed(327, 2, false),
    "PERCENTILE" => fixed(328, 2, false),
    "PERCENTRANK" => var(329, false),
    "MODE" => var(330, false),
    "TRIMMEAN" => fixed(331, 2, false),
    "TINV" => fixed(332, 2, false),
    "CONCATENATE" => var(336, false),
    "POWER" => fixed(337, 2, false),
    "RADIANS" => fixed(342, 1, false),
    "DEGREES" => fixed(343, 1, false),
    "SUBTOTAL" => var(344, false),
    "SUMIF" => var(345, false),
    "COUNTIF" => fixed(346, 2, false),
    "COUNTBLANK" => fixed(347, 1, false),
    "ROMAN" => var(354, false),
};

/// Look up a function by its (case-insensitive) name
pub fn lookup(name: &str) -> Option<&'static FunctionSpec> {
    if name.bytes().any(|b| b.is_ascii_lowercase()) {
        FUNCTIONS.get(name.to_ascii_uppercase().as_str())
    } else {
        FUNCTIONS.get(name)
    }
}
