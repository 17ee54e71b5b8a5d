//! PowerShell scripts driving external engines.
//!
//! Scripts take their inputs from environment variables so that file and
//! printer names never need quoting:
//!
//! - `BATCHPRINT_FILE`: document path
//! - `BATCHPRINT_PRINTER`: printer name, empty for the system default
//! - `BATCHPRINT_COPIES`: copy count
//! - `BATCHPRINT_PROGID`: COM class to probe
//! - `BATCHPRINT_TICKET`: PrintTicket XML to apply
//!
//! Office scripts exit with [`EXIT_NO_ENGINE`] when the COM class cannot be
//! created, print measurements as one line of JSON on stdout, and always
//! close the document and quit the host application in `finally`.

/// Exit code meaning the automation server is not installed.
pub const EXIT_NO_ENGINE: i32 = 3;

/// Password passed to every open call so protected files fail instead of prompting.
pub const SENTINEL_PASSWORD: &str = "batchprint-no-password";

/// Checks whether a COM class is registered.
pub const PROBE: &str = r#"
$type = [Type]::GetTypeFromProgID($env:BATCHPRINT_PROGID)
if ($type -eq $null) { exit 3 }
exit 0
"#;

/// Word: page count via ComputeStatistics(wdStatisticPages).
pub const WORD_MEASURE: &str = r#"
$ErrorActionPreference = 'Stop'
try { $app = New-Object -ComObject Word.Application } catch { [Console]::Error.WriteLine($_.Exception.Message); exit 3 }
$doc = $null
try {
    $app.Visible = $false
    $app.DisplayAlerts = 0
    $doc = $app.Documents.Open($env:BATCHPRINT_FILE, $false, $true, $false, 'batchprint-no-password', 'batchprint-no-password')
    $pages = $doc.ComputeStatistics(2)
    @{ pages = [int]$pages } | ConvertTo-Json -Compress
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 1
} finally {
    if ($doc -ne $null) { $doc.Close($false) | Out-Null; [void][Runtime.InteropServices.Marshal]::ReleaseComObject($doc) }
    $app.Quit() | Out-Null
    [void][Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}
"#;

/// Word: print the document.
pub const WORD_PRINT: &str = r#"
$ErrorActionPreference = 'Stop'
try { $app = New-Object -ComObject Word.Application } catch { [Console]::Error.WriteLine($_.Exception.Message); exit 3 }
$doc = $null
try {
    $app.Visible = $false
    $app.DisplayAlerts = 0
    $doc = $app.Documents.Open($env:BATCHPRINT_FILE, $false, $true, $false, 'batchprint-no-password', 'batchprint-no-password')
    if ($env:BATCHPRINT_PRINTER) { $app.ActivePrinter = $env:BATCHPRINT_PRINTER }
    $doc.PrintOut($false, $false, 0, '', '', '', 0, [int]$env:BATCHPRINT_COPIES)
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 1
} finally {
    if ($doc -ne $null) { $doc.Close($false) | Out-Null; [void][Runtime.InteropServices.Marshal]::ReleaseComObject($doc) }
    $app.Quit() | Out-Null
    [void][Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}
"#;

/// PowerPoint: slide count.
pub const POWERPOINT_MEASURE: &str = r#"
$ErrorActionPreference = 'Stop'
try { $app = New-Object -ComObject PowerPoint.Application } catch { [Console]::Error.WriteLine($_.Exception.Message); exit 3 }
$pres = $null
try {
    $app.DisplayAlerts = 1
    $pres = $app.Presentations.Open($env:BATCHPRINT_FILE + '::batchprint-no-password::', -1, 0, 0)
    @{ slides = [int]$pres.Slides.Count } | ConvertTo-Json -Compress
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 1
} finally {
    if ($pres -ne $null) { $pres.Close() | Out-Null; [void][Runtime.InteropServices.Marshal]::ReleaseComObject($pres) }
    $app.Quit() | Out-Null
    [void][Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}
"#;

/// PowerPoint: print the presentation.
pub const POWERPOINT_PRINT: &str = r#"
$ErrorActionPreference = 'Stop'
try { $app = New-Object -ComObject PowerPoint.Application } catch { [Console]::Error.WriteLine($_.Exception.Message); exit 3 }
$pres = $null
try {
    $app.DisplayAlerts = 1
    $pres = $app.Presentations.Open($env:BATCHPRINT_FILE + '::batchprint-no-password::', -1, 0, 0)
    $options = $pres.PrintOptions
    if ($env:BATCHPRINT_PRINTER) { $options.ActivePrinter = $env:BATCHPRINT_PRINTER }
    $options.NumberOfCopies = [int]$env:BATCHPRINT_COPIES
    $options.PrintInBackground = 0
    $pres.PrintOut()
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 1
} finally {
    if ($pres -ne $null) { $pres.Close() | Out-Null; [void][Runtime.InteropServices.Marshal]::ReleaseComObject($pres) }
    $app.Quit() | Out-Null
    [void][Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}
"#;

/// Excel: used range and manual page breaks of every worksheet.
pub const EXCEL_MEASURE: &str = r#"
$ErrorActionPreference = 'Stop'
try { $app = New-Object -ComObject Excel.Application } catch { [Console]::Error.WriteLine($_.Exception.Message); exit 3 }
$wb = $null
try {
    $app.Visible = $false
    $app.DisplayAlerts = $false
    $app.ScreenUpdating = $false
    $wb = $app.Workbooks.Open($env:BATCHPRINT_FILE, 0, $true, 5, 'batchprint-no-password', 'batchprint-no-password', $true)
    $sheets = @()
    foreach ($ws in $wb.Worksheets) {
        $rows = 0
        $columns = 0
        if ($app.WorksheetFunction.CountA($ws.Cells) -gt 0) {
            $used = $ws.UsedRange
            $rows = [int]$used.Rows.Count
            $columns = [int]$used.Columns.Count
        }
        $sheets += @{
            name = [string]$ws.Name
            rows = $rows
            columns = $columns
            horizontal_breaks = [int]$ws.HPageBreaks.Count
            vertical_breaks = [int]$ws.VPageBreaks.Count
        }
    }
    @{ sheets = @($sheets) } | ConvertTo-Json -Compress -Depth 4
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 1
} finally {
    if ($wb -ne $null) { $wb.Close($false) | Out-Null; [void][Runtime.InteropServices.Marshal]::ReleaseComObject($wb) }
    $app.Quit() | Out-Null
    [void][Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}
"#;

/// Excel: print every worksheet.
pub const EXCEL_PRINT: &str = r#"
$ErrorActionPreference = 'Stop'
try { $app = New-Object -ComObject Excel.Application } catch { [Console]::Error.WriteLine($_.Exception.Message); exit 3 }
$wb = $null
try {
    $app.Visible = $false
    $app.DisplayAlerts = $false
    $wb = $app.Workbooks.Open($env:BATCHPRINT_FILE, 0, $true, 5, 'batchprint-no-password', 'batchprint-no-password', $true)
    $printer = [Type]::Missing
    if ($env:BATCHPRINT_PRINTER) { $printer = $env:BATCHPRINT_PRINTER }
    $wb.PrintOut([Type]::Missing, [Type]::Missing, [int]$env:BATCHPRINT_COPIES, $false, $printer)
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 1
} finally {
    if ($wb -ne $null) { $wb.Close($false) | Out-Null; [void][Runtime.InteropServices.Marshal]::ReleaseComObject($wb) }
    $app.Quit() | Out-Null
    [void][Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}
"#;

/// Shell `print` verb on the default printer.
pub const SHELL_PRINT: &str =
    "Start-Process -FilePath $env:BATCHPRINT_FILE -Verb Print -WindowStyle Hidden -ErrorAction Stop";

/// Shell `printto` verb on a named printer.
pub const SHELL_PRINT_TO: &str = "Start-Process -FilePath $env:BATCHPRINT_FILE -Verb PrintTo \
     -ArgumentList ('\"' + $env:BATCHPRINT_PRINTER + '\"') -WindowStyle Hidden -ErrorAction Stop";

/// Open the file in its default application.
pub const SHELL_OPEN: &str = "Start-Process -FilePath $env:BATCHPRINT_FILE -ErrorAction Stop";

/// Printer configuration: write the current PrintTicket XML to stdout.
pub const PRINT_TICKET_GET: &str = r#"
$ErrorActionPreference = 'Stop'
try {
    (Get-PrintConfiguration -PrinterName $env:BATCHPRINT_PRINTER).PrintTicketXML
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 1
}
"#;

/// Printer configuration: replace the PrintTicket.
pub const PRINT_TICKET_SET: &str = r#"
$ErrorActionPreference = 'Stop'
try {
    Set-PrintConfiguration -PrinterName $env:BATCHPRINT_PRINTER -PrintTicketXml $env:BATCHPRINT_TICKET
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 1
}
"#;
