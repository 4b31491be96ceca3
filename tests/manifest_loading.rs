//! End-to-end manifest loading: files on disk, generated documents, and the
//! duplicate/partial-commit rules, all through the public runtime surface.

use sxs_activation::{ActivationError, ActivationRuntime, ThreadingModel};

#[test]
fn test_registry_contains_exactly_the_declared_classes() {
    // N distinct classes spread over M files: the catalog ends up with
    // exactly N entries, each resolvable case-insensitively.
    let runtime = ActivationRuntime::new();
    let count = runtime
        .load_manifest_xml(
            r#"<assembly>
                 <file name="alpha.dll">
                   <activatableClass name="Fabrikam.Alpha.One" threadingModel="sta" />
                   <activatableClass name="Fabrikam.Alpha.Two" threadingModel="mta" />
                 </file>
                 <file name="beta.dll">
                   <activatableClass name="Fabrikam.Beta.One" threadingModel="both" />
                 </file>
                 <file name="gamma.dll">
                   <activatableClass name="Fabrikam.Gamma.One" threadingModel="both" />
                   <activatableClass name="Fabrikam.Gamma.Two" threadingModel="sta" />
                 </file>
               </assembly>"#,
        )
        .unwrap();

    assert_eq!(count, 5);
    assert_eq!(runtime.catalog().len(), 5);
    for class_id in [
        "fabrikam.alpha.one",
        "FABRIKAM.ALPHA.TWO",
        "Fabrikam.Beta.One",
        "fabrikam.Gamma.ONE",
        "Fabrikam.Gamma.Two",
    ] {
        assert!(
            runtime.catalog().lookup(class_id).is_some(),
            "expected {} to resolve",
            class_id
        );
    }
}

#[test]
fn test_round_trip_of_generated_manifest() {
    let declared: Vec<(&str, &str, ThreadingModel)> = vec![
        ("Contoso.Audio.Decoder", "audio.dll", ThreadingModel::Mta),
        ("Contoso.Audio.Encoder", "audio.dll", ThreadingModel::Mta),
        ("Contoso.Video.Player", "video.dll", ThreadingModel::Sta),
        ("Contoso.Core.Settings", "core.dll", ThreadingModel::Both),
    ];

    let mut xml = String::from("<assembly>\n");
    for (class_id, file, model) in &declared {
        let model = match model {
            ThreadingModel::Sta => "sta",
            ThreadingModel::Mta => "mta",
            ThreadingModel::Both => "both",
        };
        xml.push_str(&format!(
            "  <file name=\"{}\"><activatableClass name=\"{}\" threadingModel=\"{}\" /></file>\n",
            file, class_id, model
        ));
    }
    xml.push_str("</assembly>\n");

    let runtime = ActivationRuntime::new();
    assert_eq!(runtime.load_manifest_xml(&xml).unwrap(), declared.len());
    assert_eq!(runtime.catalog().len(), declared.len());

    // No omissions, with the declared module and threading model intact.
    for (class_id, file, model) in &declared {
        let provider = runtime.catalog().lookup(class_id).unwrap();
        assert_eq!(provider.module_path(), *file);
        assert_eq!(provider.threading_model(), *model);
        assert_eq!(runtime.get_threading_model(class_id).unwrap(), *model);
    }
}

#[test]
fn test_duplicate_across_files_keeps_first_provider() {
    let runtime = ActivationRuntime::new();
    let err = runtime
        .load_manifest_xml(
            r#"<assembly>
                 <file name="first.dll">
                   <activatableClass name="Contoso.Dup" threadingModel="mta" />
                 </file>
                 <file name="second.dll">
                   <activatableClass name="Contoso.Dup" threadingModel="sta" />
                 </file>
               </assembly>"#,
        )
        .unwrap_err();

    assert!(matches!(err, ActivationError::DuplicateClass { .. }));
    let kept = runtime.catalog().lookup("Contoso.Dup").unwrap();
    assert_eq!(kept.module_path(), "first.dll");
    assert_eq!(kept.threading_model(), ThreadingModel::Mta);
}

#[test]
fn test_duplicate_across_documents_keeps_first_provider() {
    let runtime = ActivationRuntime::new();
    runtime
        .load_manifest_xml(
            r#"<assembly><file name="first.dll"><activatableClass name="Contoso.Dup" threadingModel="both" /></file></assembly>"#,
        )
        .unwrap();

    let err = runtime
        .load_manifest_xml(
            r#"<assembly><file name="second.dll"><activatableClass name="contoso.dup" threadingModel="sta" /></file></assembly>"#,
        )
        .unwrap_err();

    assert_eq!(
        err,
        ActivationError::DuplicateClass {
            class_id: "contoso.dup".into()
        }
    );
    assert_eq!(runtime.catalog().len(), 1);
    assert_eq!(
        runtime.catalog().lookup("Contoso.Dup").unwrap().module_path(),
        "first.dll"
    );
}

#[test]
fn test_manifest_file_loaded_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = dir.path().join("app.manifest");
    std::fs::write(
        &manifest_path,
        r#"<assembly>
             <file name="widgets.dll">
               <activatableClass name="Contoso.Widgets.Widget" threadingModel="both" xmlns="urn:contoso" />
             </file>
           </assembly>"#,
    )
    .unwrap();

    let runtime = ActivationRuntime::new();
    assert_eq!(runtime.load_manifest_path(&manifest_path).unwrap(), 1);

    let provider = runtime.catalog().lookup("Contoso.Widgets.Widget").unwrap();
    assert_eq!(provider.xmlns(), Some("urn:contoso"));
}

#[test]
fn test_malformed_manifest_surfaces_typed_error() {
    let runtime = ActivationRuntime::new();

    for xml in [
        // unclosed file block
        r#"<assembly><file name="w.dll"><activatableClass name="A.B" threadingModel="both" /></assembly>"#,
        // threading model missing
        r#"<assembly><file name="w.dll"><activatableClass name="A.B" /></file></assembly>"#,
        // threading model unknown
        r#"<assembly><file name="w.dll"><activatableClass name="A.B" threadingModel="apartment" /></file></assembly>"#,
        // file name missing
        r#"<assembly><file><activatableClass name="A.B" threadingModel="both" /></file></assembly>"#,
    ] {
        let err = runtime.load_manifest_xml(xml).unwrap_err();
        assert!(
            matches!(err, ActivationError::MalformedManifest { .. }),
            "expected MalformedManifest for {:?}, got {:?}",
            xml,
            err
        );
    }
}

#[test]
fn test_document_without_file_elements_registers_nothing() {
    let runtime = ActivationRuntime::new();
    assert_eq!(
        runtime
            .load_manifest_xml(r#"<assembly><assemblyIdentity name="app" /></assembly>"#)
            .unwrap(),
        0
    );
    assert!(runtime.catalog().is_empty());
}
