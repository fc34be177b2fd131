//! The declarative decision table itself, ported line-for-line from the
//! original `_TreePathMapping`.
//!
//! Two table-only constructs from the Python original collapse onto one
//! Rust variant each:
//! - `('godeepr', '')` and any `(repo, '')` both mean "don't remap this
//!   entry yet, just keep walking the source tree" — the Python caller
//!   discards the repo name in both cases (see `_MangleTree`'s
//!   `else: #path = '' => godeepr` arm) — so both become
//!   [`MappingDecision::Descend`] here.
//! - `('drop', '')` becomes [`MappingDecision::Drop`].
//! - Anything else becomes a [`MappingDecision::Remap`], with `subpath`
//!   passed through verbatim (including the literal `"/"` root marker)
//!   and an optional rename when the table names one.

use super::MappingDecision;
use log::warn;

fn basename(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((_, tail)) => tail,
        None => path,
    }
}

fn dirname(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((head, _)) => head,
        None => "",
    }
}

fn descend() -> MappingDecision {
    MappingDecision::Descend
}

fn drop() -> MappingDecision {
    MappingDecision::Drop
}

fn remap(repo: &str, subpath: &str) -> MappingDecision {
    MappingDecision::remap(repo, subpath)
}

fn remap_renamed(repo: &str, subpath: &str, new_name: &str) -> MappingDecision {
    MappingDecision::remap_renamed(repo, subpath, new_name)
}

pub fn lookup(depth: u32, entry_name: &[u8], parent_path: &str) -> MappingDecision {
    let fname = String::from_utf8_lossy(entry_name);
    let fname = fname.as_ref();

    if depth == 0 {
        return if fname == "ruscorpora" {
            descend()
        } else {
            warn!("unknown depth-0 branch {parent_path}/{fname}, dropping");
            drop()
        };
    }

    if depth == 1 {
        match fname {
            "trunk" => return descend(),
            "branches" => return drop(),
            "tags" => return drop(),
            _ => {}
        }
    }

    if depth == 2 {
        match fname {
            "corpora" => return descend(),
            "www" | "saas" | "conf" | "db" | "hooks" | "locks" | "ruscorpora_suggest"
            | "makeup" | "tagged" => return drop(),
            "README.txt" | "format" => return drop(),
            "accent" => return remap("accent", "accent_main/texts"),
            "spoken" | "tables" => return descend(),
            "research" => return descend(),
            "standard" | "source" => return descend(),
            "texts" => return descend(),
            _ => {}
        }
    }

    let parent = basename(parent_path);
    let parentparent = basename(dirname(parent_path));

    if depth == 3 {
        if parent == "corpora" {
            match fname {
                "spoken" => return descend(),
                "version" => return drop(),
                "para_rus_ger" => return drop(),
                "18century" | "folklore" | "test_corpus" | "research" => return descend(),
                "slav" => return descend(),
                _ => return descend(),
            }
        }

        if parent == "spoken" {
            match fname {
                "manual" => return remap("spoken", "manual/texts"),
                "private" | "public" => return remap("spoken", &format!("texts/{fname}")),
                "tabl_manual_spoken.csv" => {
                    return remap_renamed("spoken", "manual/tables", "manual.csv")
                }
                "spoken.csv" => return remap("spoken", "tables"),
                "murco" => return remap("murco", "/"),
                _ => {}
            }
        }

        if parent == "standard" || parent == "source" {
            match fname {
                "pre1950" | "post1950" => {
                    return remap("main", &format!("{parent}/texts/{fname}"))
                }
                "standard_1.csv" => {
                    return remap_renamed("main", &format!("{parent}/tables"), "standard.csv")
                }
                _ => {}
            }
        }

        if parent == "texts" {
            match fname {
                "source" | "standard" => return remap("main", &format!("{fname}/texts")),
                "accent" => return descend(),
                "school" | "syntax" => return remap(fname, "texts"),
                "dialect" | "spoken" | "murco" | "poetic" | "para" | "paper" => return descend(),
                _ => {}
            }
        }

        if parent == "research" {
            return remap("projects", &format!("{parent}/{fname}"));
        }

        if parent == "tables" {
            return remap(parent, "/");
        }
    }

    if depth == 4 {
        if parent == "dialect" {
            match fname {
                "texts" | "tables" => return remap(parent, fname),
                "dialect.csv" => return remap(parent, "tables"),
                _ => {}
            }
        }

        if parent == "spoken" {
            match fname {
                "private" | "public" => return remap(parent, &format!("texts/{fname}")),
                "tabl_manual_spoken.csv" => {
                    return remap_renamed(parent, "manual/tables", "manual.csv")
                }
                "spoken.csv" => return remap(parent, "tables"),
                "tables" | "texts" | "manual" | "murco" | "accent" => return descend(),
                _ => {}
            }
        }

        if parent == "murco" {
            match fname {
                "kino" => return descend(),
                "private" | "public" => return remap(parent, &format!("texts/{fname}")),
                "murco.csv" | "video_ids.txt" => return remap(parent, "tables"),
                "texts" | "tables" | "meta" => return remap(parent, fname),
                _ => {}
            }
        }

        if parent == "poetic" {
            match fname {
                "xix" | "xviii" | "xx" => return remap(parent, &format!("texts/{fname}")),
                "poetic.csv" => return remap(parent, "tables"),
                "texts" => return descend(),
                "tables" => return remap(parent, fname),
                _ => {}
            }
        }

        if parent == "main" && (fname == "source" || fname == "standard") {
            return remap(parent, fname);
        }

        if parent == "para" {
            match fname {
                "texts" | "tables" => return descend(),
                "para.csv" => return remap(parent, "tables"),
                _ if fname.starts_with("rus") || fname.ends_with("rus") => {
                    return remap(parent, &format!("texts/{fname}"))
                }
                _ => {}
            }
        }

        if parent == "accent" {
            match fname {
                "texts" | "tables" => return remap(parent, &format!("accent_main/{fname}")),
                "accent.csv" => return remap(parent, "accent_main/tables"),
                "public" | "private" | "kino" => {
                    return remap(parent, &format!("accent_main/texts/{fname}"))
                }
                _ => return remap(parent, fname),
            }
        }

        if parent_path == "/ruscorpora/trunk/corpora/tables" {
            return if fname == "validation" {
                remap("tables", fname)
            } else {
                remap("tables", "/")
            };
        }

        if parent_path == "/ruscorpora/trunk/texts/paper" {
            return match fname {
                "RIAN" => remap(parent, &format!("texts/{}", fname.to_lowercase())),
                "paper.csv" => remap(parent, "tables"),
                _ => remap(parent, &format!("texts/{fname}")),
            };
        }

        if parent_path == "/ruscorpora/trunk/corpora/paper"
            && matches!(
                fname,
                "README.txt" | "Desktop.ini" | "conf" | "db" | "format" | "hooks" | "locks"
                    | "svn.ico"
            )
        {
            return drop();
        }

        if parent == "regional_grodno" || parent == "multiparc" {
            return if fname.ends_with("xls") {
                remap(parent, "/")
            } else {
                remap(parent, fname)
            };
        }

        if parent == "slav" {
            match fname {
                "texts" | "tables" | "old_slav" => return descend(),
                "orthlib" | "birchbark" | "mid_rus" | "old_rus" => return descend(),
                "mid_rus_new" => return descend(),
                "txt-renamer.py" => return drop(),
                _ if is_akty_txt(fname) => {
                    return remap("mid_rus", "texts/gramoty_akty_14_16")
                }
                "Летописец начала царства-out.txt" => {
                    return remap_renamed("mid_rus", "texts/letopisets", "Letopisets-out.txt")
                }
                "meta.xls" => return remap("mid_rus", fname),
                _ => return descend(),
            }
        }

        if parent == "test_corpus" {
            return if fname == "README" {
                remap("projects", parent)
            } else {
                remap("projects", &format!("{parent}/{fname}"))
            };
        }

        if parent == "18century" {
            match fname {
                "table" | "tables" => return remap("projects", &format!("{parent}/tables")),
                "texts" => return remap("projects", &format!("{parent}/{fname}")),
                _ => {}
            }
        }

        if parent == "folklore" {
            return remap("projects", &format!("{parent}/{fname}"));
        }

        if parent == "research" {
            return remap("projects", &format!("{parent}/{fname}"));
        }

        if fname == "texts" || fname == "tables" {
            return remap(parent, fname);
        }
    }

    if depth == 5 {
        if parent_path == "/ruscorpora/trunk/corpora/para/texts"
            || parent_path == "/ruscorpora/trunk/corpora/para/tables"
        {
            if fname.starts_with("rus") || fname.ends_with("rus") || fname == "multi" {
                return remap("para", &format!("texts/{fname}"));
            }
            if fname.ends_with("csv") || fname.ends_with("djvu") {
                return remap("para", "tables");
            }
        }

        if parent_path == "/ruscorpora/trunk/corpora/murco/kino"
            || parent_path == "/ruscorpora/trunk/texts/murco/kino"
        {
            return remap("murco", &format!("kino/{}", fname.to_lowercase()));
        }

        if parent_path == "/ruscorpora/trunk/corpora/poetic/texts" {
            return if fname == "poetic" {
                descend()
            } else {
                remap("poetic", &format!("texts/{fname}"))
            };
        }

        if parent_path == "/ruscorpora/trunk/corpora/spoken/texts" {
            return match fname {
                "manual" => remap("spoken", "manual/texts"),
                "spoken.csv" => remap("spoken", "tables"),
                "tabl_manual_spoken.csv" => {
                    remap_renamed("spoken", "manual/tables", "manual.csv")
                }
                _ => remap("spoken", &format!("texts/{fname}")),
            };
        }

        if parent_path == "/ruscorpora/trunk/corpora/spoken/manual"
            || parent_path == "/ruscorpora/trunk/texts/spoken/manual"
        {
            return match fname {
                "texts" => remap("spoken", "manual/texts"),
                "tables" => descend(),
                _ => remap("spoken", &format!("manual/texts/{fname}")),
            };
        }

        if parent_path == "/ruscorpora/trunk/corpora/spoken/tables" {
            return match fname {
                "tabl_manual_spoken.csv" => {
                    remap_renamed("spoken", "manual/tables", "manual.csv")
                }
                "spoken.csv" => remap("spoken", "tables"),
                _ => remap("spoken", "tables"),
            };
        }

        if parent_path == "/ruscorpora/trunk/corpora/spoken/murco" {
            return remap("murco", fname);
        }
        if parent_path == "/ruscorpora/trunk/corpora/spoken/accent" {
            return remap("accent", fname);
        }

        if parentparent == "slav" {
            match parent {
                "mosk_del_byt_pism-1" | "pskov_letopisi" | "morozov" | "jaroslav_etc"
                | "gramoty_akty_14_16" | "gramotki_17_18" | "duhovnye_dogovornye" | "BDRL"
                | "letopisets" => return remap("mid_rus", &format!("texts/{parent}")),
                "Грамотки 17 - нач. 18 вв" => {
                    return remap("mid_rus", "texts/gramotki_17_18")
                }
                "Духовные и договорные грамоты" => {
                    return remap("mid_rus", "texts/duhovnye_dogovornye")
                }
                "Моск. дел. и быт. письм. Отд. 1" => {
                    return remap("mid_rus", "texts/mosk_del_byt_pism-1")
                }
                _ => {}
            }
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/texts" {
            match fname {
                "orthlib" => return remap("orthlib", "texts"),
                "old_slav" => return remap("old_rus", "texts"),
                "melissa" | "npl" => return remap("old_rus", &format!("texts/{fname}")),
                _ => {}
            }
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/tables" {
            match fname {
                "slav.csv" | "old_slav.csv" => {
                    return remap_renamed("old_rus", "tables", "old_rus.csv")
                }
                "orthlib.csv" => return remap("orthlib", "tables"),
                _ => {}
            }
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/old_slav" {
            match fname {
                "texts" => return descend(),
                "tables" => return descend(),
                _ => {}
            }
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/old_rus" {
            match fname {
                "texts" => return remap("old_rus", fname),
                "tables" => return descend(),
                _ => {}
            }
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/orthlib"
            && matches!(fname, "texts" | "tables" | "textss")
        {
            return remap("orthlib", fname);
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/birchbark"
            && matches!(fname, "texts" | "tables")
        {
            return remap("birchbark", fname);
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/mid_rus" {
            if is_mid_rus_corpus_name(fname) {
                return remap("mid_rus", &format!("texts/{}", fname.to_lowercase()));
            }
            match fname {
                "texts" | "tables" => return descend(),
                _ => {}
            }
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/mid_rus_new" {
            if fname == "texts" || fname == "tables" {
                return descend();
            }
            if is_mid_rus_corpus_name(fname) || fname == "polotsk" {
                return remap("mid_rus", &format!("texts/{}", fname.to_lowercase()));
            }
            if is_mid_rus_new_text_bucket(fname) {
                return remap("mid_rus", &format!("texts/{}", fname.to_lowercase()));
            }
            if fname == "GramEval2020-17cent-test.RNC.nolemma.xml" {
                return drop();
            }
        }
    }

    if depth == 6 {
        if parent_path == "/ruscorpora/trunk/corpora/poetic/texts/poetic" {
            return if fname == "poetic.csv" {
                remap("poetic", "tables")
            } else {
                remap("poetic", &format!("texts/{fname}"))
            };
        }

        if parent_path == "/ruscorpora/trunk/corpora/spoken/manual/tables" {
            return if fname == "spoken_manual.csv" {
                remap_renamed("spoken", "manual/tables", "manual.csv")
            } else {
                remap("spoken", "manual/tables")
            };
        }

        if (parent_path == "/ruscorpora/trunk/corpora/slav/old_slav/tables"
            || parent_path == "/ruscorpora/trunk/corpora/slav/old_rus/tables")
            && matches!(fname, "old_slav.csv" | "old_rus.csv")
        {
            return remap_renamed("old_rus", "tables", "old_rus.csv");
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/old_slav/texts" {
            return if fname == "birchbark" {
                remap("birchbark", "texts")
            } else {
                remap("old_rus", &format!("texts/{fname}"))
            };
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/mid_rus/texts" {
            return if fname.ends_with("xml") {
                remap("mid_rus", "texts/varia2")
            } else {
                remap("mid_rus", &format!("texts/{}", fname.to_lowercase()))
            };
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/mid_rus/tables"
            && matches!(fname, "meta.csv" | "mid_rus.csv")
        {
            return remap_renamed("mid_rus", "tables", "mid_rus.csv");
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/mid_rus_new/texts"
            && (is_mid_rus_corpus_name(fname) || fname == "polotsk" || is_mid_rus_new_text_bucket(fname))
        {
            return remap("mid_rus", &format!("texts/{}", fname.to_lowercase()));
        }

        if parent_path == "/ruscorpora/trunk/corpora/slav/mid_rus_new/tables"
            && fname == "mid_rus_new.csv"
        {
            return remap_renamed("mid_rus", "tables", "mid_rus.csv");
        }
    }

    warn!("unprocessed depth-{depth} entry {parent_path}/{fname}, dropping");
    drop()
}

fn is_akty_txt(fname: &str) -> bool {
    fname.contains("_akty_") && fname.ends_with("txt")
}

fn is_mid_rus_corpus_name(fname: &str) -> bool {
    matches!(
        fname,
        "mosk_del_byt_pism-1"
            | "pskov_letopisi"
            | "morozov"
            | "jaroslav_etc"
            | "gramoty_akty_14_16"
            | "gramotki_17_18"
            | "duhovnye_dogovornye"
            | "BDRL"
            | "letopisets"
    )
}

fn is_mid_rus_new_text_bucket(fname: &str) -> bool {
    matches!(
        fname,
        "afz1" | "afz2" | "afz3" | "amg" | "apd" | "bdrl" | "drama" | "gvnp" | "kungur"
            | "letopisi_varia" | "nkl" | "pososhkov" | "psrl34" | "rd" | "rib" | "st_kn"
            | "statspis" | "varia" | "varia2" | "zagovor" | "lebedev"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::RepoId;

    #[test]
    fn rename_rule_standard_1_csv() {
        let decision = lookup(
            3,
            b"standard_1.csv",
            "/ruscorpora/trunk/standard",
        );
        assert_eq!(
            decision,
            MappingDecision::Remap {
                repo: RepoId::new("main"),
                subpath: "standard/tables".to_string(),
                rename: Some("standard.csv".to_string()),
            }
        );
    }

    #[test]
    fn rename_rule_tabl_manual_spoken() {
        let decision = lookup(4, b"tabl_manual_spoken.csv", "/ruscorpora/trunk/corpora/spoken");
        assert_eq!(
            decision,
            MappingDecision::remap_renamed("spoken", "manual/tables", "manual.csv")
        );
    }

    #[test]
    fn rename_rule_letopisets() {
        let decision = lookup(
            4,
            "Летописец начала царства-out.txt".as_bytes(),
            "/ruscorpora/trunk/corpora/slav",
        );
        assert_eq!(
            decision,
            MappingDecision::remap_renamed(
                "mid_rus",
                "texts/letopisets",
                "Letopisets-out.txt"
            )
        );
    }

    #[test]
    fn murco_root_marker_is_slash() {
        let decision = lookup(3, b"murco", "/ruscorpora/trunk/corpora/spoken");
        assert_eq!(decision, MappingDecision::remap("murco", "/"));
    }

    #[test]
    fn akty_txt_pattern_matches_regardless_of_exact_name() {
        let decision = lookup(
            4,
            b"1613_akty_sudnye.txt",
            "/ruscorpora/trunk/corpora/slav",
        );
        assert_eq!(
            decision,
            MappingDecision::remap("mid_rus", "texts/gramoty_akty_14_16")
        );
    }
}
